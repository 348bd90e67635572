#![deny(warnings)]

//! Console game: twelve weeks of running a one-product company with an AI
//! advisor that learns the market as you play.

use anyhow::{Context, Result};
use sim_core::{ActionOverride, PeriodSnapshot, SessionConfig};
use sim_runtime::{Decision, PeriodBrief, Session, SessionSummary};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    seed: Option<u64>,
    periods: Option<u32>,
    auto: bool,
    json: bool,
    version: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> CliArgs {
    let mut out = CliArgs::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => out.config = it.next().map(PathBuf::from),
            "--seed" => out.seed = it.next().and_then(|s| s.parse().ok()),
            "--periods" => out.periods = it.next().and_then(|s| s.parse().ok()),
            "--auto" => out.auto = true,
            "--json" => out.json = true,
            "--version" => out.version = true,
            _ => {}
        }
    }
    out
}

fn load_config(args: &CliArgs) -> Result<SessionConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SessionConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    if let Some(periods) = args.periods {
        cfg.periods = periods;
    }
    Ok(cfg)
}

/// Print a prompt and read one trimmed line. `None` on EOF or read error.
fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Option<String> {
    let _ = write!(out, "{prompt}").and_then(|_| out.flush());
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn parse_override(price: &str, ad_spend: &str, production: &str) -> ActionOverride {
    ActionOverride {
        price: price.parse().ok(),
        ad_spend: ad_spend.parse().ok(),
        production: production.parse().ok(),
    }
}

fn wants_override(answer: &str) -> bool {
    matches!(answer.chars().next(), Some('n' | 'N'))
}

fn prompt_decision<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Decision {
    let answer = ask(input, out, "Accept AI plan? (y/n) ").unwrap_or_default();
    if !wants_override(&answer) {
        return Decision::Accept;
    }
    let price = ask(input, out, "Enter your Price [$9..$40]: ").unwrap_or_default();
    let ad = ask(input, out, "Enter your Ad Spend [$0..$10000]: ").unwrap_or_default();
    let prod = ask(input, out, "Enter your Production [0..200]: ").unwrap_or_default();
    Decision::Override(parse_override(&price, &ad, &prod))
}

fn print_banner<W: Write>(out: &mut W, cfg: &SessionConfig) -> io::Result<()> {
    writeln!(out, "==============================")?;
    writeln!(out, "  AI TYCOON - The Business Brain")?;
    writeln!(out, "==============================\n")?;
    writeln!(
        out,
        "Goal: grow profits over {} weeks. Your AI advisor learns and suggests a plan each week.",
        cfg.periods
    )?;
    writeln!(
        out,
        "Unit production cost = ${:.2}. Fixed weekly overhead = ${:.2}.",
        cfg.economics.unit_cost, cfg.economics.fixed_cost
    )?;
    writeln!(
        out,
        "You begin with {} units in inventory and ${} cash.",
        cfg.starting_inventory, cfg.starting_cash
    )
}

fn print_brief<W: Write>(out: &mut W, brief: &PeriodBrief) -> io::Result<()> {
    let a = brief.suggestion.action;
    let w = brief.weights;
    writeln!(out, "\n==== Week {} ====", brief.period)?;
    writeln!(out, "Market event: {}", brief.event.name())?;
    writeln!(
        out,
        "AI suggests -> Price: ${:.2} | Ad: ${:.2} | Produce: {} units (expected profit ${:.2})",
        a.price, a.ad_spend, a.production, brief.suggestion.predicted_profit
    )?;
    writeln!(
        out,
        "  AI model weights: w0={:.3}, wP={:.3}, wA={:.3}, wB={:.3}, wI={:.3}",
        w.bias, w.price, w.ad, w.base_proxy, w.inventory
    )
}

fn print_results<W: Write>(
    out: &mut W,
    snap: &PeriodSnapshot,
    session: &Session,
) -> io::Result<()> {
    writeln!(out, "\n-- Results --")?;
    writeln!(out, "Sold: {} units | Revenue: ${}", snap.sold, snap.revenue)?;
    writeln!(out, "Costs: ${} | Profit: ${}", snap.cost, snap.profit)?;
    writeln!(
        out,
        "End Inventory: {} | Cash: ${}",
        snap.inventory_end, snap.cash_end
    )?;
    writeln!(
        out,
        "Market baseline (hidden true): {:.2} | Your inferred proxy: {:.2}",
        snap.base_demand,
        session.public_proxy()
    )?;
    if session.is_bankrupt() {
        writeln!(out, "\nYou ran out of cash. Game over early.")?;
    }
    Ok(())
}

fn print_summary<W: Write>(out: &mut W, summary: &SessionSummary) -> io::Result<()> {
    writeln!(out, "\n================ SUMMARY ================")?;
    writeln!(
        out,
        "Total Profit: ${} | Total Units Sold: {}",
        summary.total_profit, summary.total_units_sold
    )?;
    writeln!(
        out,
        "Final Cash: ${} | Final Inventory: {}",
        summary.final_cash, summary.final_inventory
    )?;
    writeln!(out, "Thanks for playing AI Tycoon!")
}

/// Play the session to the end.
///
/// Banner, briefs, prompts and per-week results go to `hud`. The final
/// summary goes to `out`, as JSON when `--json` is set.
fn play<R, H, O>(
    session: &mut Session,
    args: &CliArgs,
    input: &mut R,
    hud: &mut H,
    out: &mut O,
) -> Result<()>
where
    R: BufRead,
    H: Write,
    O: Write,
{
    print_banner(hud, session.config())?;
    while !session.is_over() {
        let mut hud_err = None;
        let snap = session.advance_period(|brief| {
            if let Err(e) = print_brief(hud, brief) {
                hud_err = Some(e);
            }
            if args.auto {
                Decision::Accept
            } else {
                prompt_decision(input, hud)
            }
        })?;
        if let Some(e) = hud_err {
            return Err(e.into());
        }
        print_results(hud, &snap, session)?;
    }

    let summary = session.summary();
    if args.json {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
    } else {
        print_summary(out, &summary)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1));
    if args.version {
        println!(
            "ai-tycoon {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    let cfg = load_config(&args)?;
    info!(?args, seed = cfg.seed, "starting CLI");

    let mut session = Session::new(cfg)?;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    // Keep stdout machine-readable under --json.
    if args.json {
        play(&mut session, &args, &mut input, &mut io::stderr(), &mut stdout)
    } else {
        play(&mut session, &args, &mut input, &mut io::stdout(), &mut stdout)
    }
}
