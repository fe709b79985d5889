//! Model-checks a ping-pong protocol between two roles.
//!
//! Run with:
//! ```bash
//! cargo run --example ping_pong -- --rounds 3
//! ```

use clap::Parser;
use lts_rs::action::{Action, RolePattern};
use lts_rs::formula::Formulas;
use lts_rs::graph::{AcceptAll, Graph, Label};
use lts_rs::model::{Model, ProtocolState};

/// Args for the ping-pong demo.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of ping-pong rounds before the channel is closed.
    #[arg(long, default_value_t = 3)]
    rounds: u32,

    /// Also print the `des` export of the expanded LTS.
    #[arg(long)]
    export: bool,
}

/// One configuration of the ping-pong protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Config {
    round: u32,
    phase: Phase,
    action: Option<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Phase {
    Ping,
    Pong,
    Closed,
}

impl ProtocolState for Config {
    fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let cli = Cli::parse();
    let rounds = cli.rounds;

    let initial = Config {
        round: 0,
        phase: Phase::Ping,
        action: None,
    };
    let graph = Graph::new([initial], move |c: &Config| {
        let step = |phase, round, action: Action| {
            (
                Label::new(action.to_string(), action.clone(), AcceptAll),
                vec![Config {
                    round,
                    phase,
                    action: Some(action),
                }],
            )
        };
        match c.phase {
            Phase::Ping if c.round < rounds => {
                vec![step(Phase::Pong, c.round, Action::send("a", "b"))]
            }
            Phase::Ping => vec![step(Phase::Closed, c.round, Action::close("a", "b"))],
            Phase::Pong => vec![step(Phase::Ping, c.round + 1, Action::send("b", "a"))],
            Phase::Closed => vec![],
        }
    });

    graph.expand_roots_recursively();
    println!("graph = {:?}", graph);

    let formulas = Formulas::new();
    let mut model = Model::new(&graph);

    // No role ever messages itself.
    let no_self_send = formulas.ag(formulas.not(formulas.self_comm("a")));
    // A used channel is eventually closed.
    let channel_closed = formulas.ag(formulas.implies(
        formulas.send("a", "b"),
        formulas.af(formulas.close("a", "b")),
    ));
    // b never closes the channel.
    let b_never_closes = formulas.ag(formulas.not(formulas.close("b", RolePattern::Any)));

    for (name, f) in [
        ("no self-send", no_self_send),
        ("used channel closed", channel_closed),
        ("b never closes", b_never_closes),
    ] {
        let holds = model.check(&formulas, f);
        println!("{:>22}: {} = {}", name, formulas.pretty(f), holds);
    }

    if cli.export {
        println!("{}", graph.to_des()?);
    }

    Ok(())
}
