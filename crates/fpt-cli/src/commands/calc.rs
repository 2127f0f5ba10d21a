use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDateTime};
use fpt_config::EngineConfig;
use fpt_output::{assess, compute_output, Formula, Reading};
use fpt_schemas::Shift;

use crate::CalcArgs;

pub fn run_calc(engine: &EngineConfig, args: &CalcArgs) -> Result<()> {
    let formula = Formula::from_code(args.formula, args.spindles).context("invalid formula")?;
    if !args.start.is_finite() || !args.end.is_finite() {
        return Err(anyhow!("--start and --end must be finite numbers"));
    }

    let reading = Reading {
        start: args.start,
        end: args.end,
        is_reset: args.reset,
        is_stopped: args.stopped,
        ne: args.ne,
    };
    let output = compute_output(formula, &reading);
    let a = assess(output, &reading, engine.implausible_threshold);

    println!("formula={}", formula.code());
    println!("output={output}");
    println!("negative={}", a.negative);
    println!("implausible={}", a.implausible);
    Ok(())
}

pub fn run_shift_suggest(at: Option<&str>) -> Result<()> {
    let now = match at {
        Some(raw) => NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M")
            .with_context(|| format!("invalid --at '{raw}' (expected YYYY-MM-DD HH:MM)"))?,
        None => Local::now().naive_local(),
    };
    let (date, shift) = Shift::suggest_for(now);
    println!("record_date={date}");
    println!("shift={shift}");
    Ok(())
}
