use anyhow::Result;
use fpt_config::EngineConfig;
use fpt_db::PgStore;
use fpt_reconcile::{preview_entry, resolve_prior_end, submit_entry, Confirmation, EntryPolicy};
use fpt_schemas::{ItemId, MachineId, ShiftEntryPayload};

use super::{load_actor, opt_num, parse_date, parse_shift, rejected};
use crate::EntryArgs;

fn payload(args: &EntryArgs) -> ShiftEntryPayload {
    ShiftEntryPayload {
        machine_id: Some(MachineId(args.machine)),
        record_date: Some(args.date.clone()),
        shift: Some(args.shift),
        item_id: args.item.map(ItemId),
        start_index: args.start,
        end_index: args.end,
        input_ne: args.ne,
        is_reset: args.reset,
        is_stopped: args.stopped,
        note: args.note.clone(),
    }
}

pub async fn run_prior(store: &PgStore, machine: i64, date: &str, shift: i64) -> Result<()> {
    let date = parse_date(date)?;
    let shift = parse_shift(shift)?;
    let prior = resolve_prior_end(store, MachineId(machine), date, shift)
        .await
        .map_err(rejected)?;
    println!("machine_id={machine}");
    println!("has_history={}", prior.is_some());
    println!("prior_end={}", opt_num(prior));
    Ok(())
}

pub async fn run_preview(store: &PgStore, engine: &EngineConfig, args: &EntryArgs) -> Result<()> {
    let policy = EntryPolicy::from(engine);
    let p = preview_entry(store, &policy, &payload(args))
        .await
        .map_err(rejected)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&p)?);
        return Ok(());
    }
    println!("machine_id={}", p.key.machine_id);
    println!("record_date={}", p.key.record_date);
    println!("shift={}", p.key.shift);
    println!("formula={}", p.formula.code());
    println!("start={} start_source={:?}", p.start.value, p.start.source);
    println!("end={}", opt_num(p.end_index));
    println!("ne={}", opt_num(p.effective_ne));
    println!("output={}", p.output);
    println!("negative={}", p.assessment.negative);
    println!("implausible={}", p.assessment.implausible);
    Ok(())
}

pub async fn run_submit(
    store: &PgStore,
    engine: &EngineConfig,
    args: &EntryArgs,
    actor: i64,
    confirm_large: bool,
) -> Result<()> {
    let actor = load_actor(store, actor).await?;
    // An operator at a terminal always confirms large outputs explicitly.
    let policy = EntryPolicy::from(engine).interactive();
    let confirmation = Confirmation {
        large_output: confirm_large,
    };

    let out = submit_entry(store, &policy, &actor, &payload(args), confirmation)
        .await
        .map_err(rejected)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    println!("log_id={}", out.log.id);
    println!("created={}", out.created);
    println!("start={}", out.log.start_index);
    println!("end={}", opt_num(out.log.end_index));
    println!("output={}", out.output);
    println!("implausible={}", out.assessment.implausible);
    println!("ne_propagated={}", out.ne_propagated);
    if let Some(e) = &out.ne_error {
        println!("ne_error={e}");
    }
    Ok(())
}
