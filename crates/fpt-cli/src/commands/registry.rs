use anyhow::Result;
use fpt_db::PgStore;
use fpt_reconcile::{delete_item, dispatch_item, shift_board};
use fpt_schemas::{ItemId, MachineId, ProcessId};

use super::{load_actor, opt_num, parse_date, parse_shift, rejected};

pub async fn run_board(store: &PgStore, process: i64, date: &str, shift: i64) -> Result<()> {
    let date = parse_date(date)?;
    let shift = parse_shift(shift)?;
    let rows = shift_board(store, ProcessId(process), date, shift)
        .await
        .map_err(rejected)?;

    let entered = rows.iter().filter(|r| r.is_entered()).count();
    println!("process_id={process} date={date} shift={shift}");
    println!("machines={} entered={} pending={}", rows.len(), entered, rows.len() - entered);
    for r in &rows {
        let item = r.current_item.as_ref().map(|i| i.name.as_str()).unwrap_or("-");
        let output = opt_num(r.shift_log.as_ref().map(|l| l.final_output));
        println!(
            "machine={} id={} item={} entered={} output={}",
            r.machine.name,
            r.machine.id,
            item,
            r.is_entered(),
            output
        );
    }
    Ok(())
}

pub async fn run_dispatch(store: &PgStore, actor: i64, item: i64, machines: &[i64]) -> Result<()> {
    let actor = load_actor(store, actor).await?;
    let ids: Vec<MachineId> = machines.iter().copied().map(MachineId).collect();
    let out = dispatch_item(store, &actor, &ids, ItemId(item))
        .await
        .map_err(rejected)?;
    println!("dispatched=true item_id={} ne={}", out.item.id, opt_num(out.item.ne));
    println!("requested={} updated={}", out.requested, out.updated);
    Ok(())
}

pub async fn run_item_delete(store: &PgStore, actor: i64, id: i64) -> Result<()> {
    let actor = load_actor(store, actor).await?;
    delete_item(store, &actor, ItemId(id))
        .await
        .map_err(rejected)?;
    println!("deleted=true item_id={id}");
    Ok(())
}
