use clap::Parser;
use renet_controller::session::Command;
use renet_controller::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let session = Session::parse();
    let config = session.load_config()?;

    match session.command {
        Command::Smoke => {
            let control_loop =
                renet_controller::run_scenario(config, renet_controller::triangle_scenario()).await;
            if session.dump_state {
                print_state(&control_loop);
            }
        }
        Command::Replay { scenario } => {
            let events = renet_controller::load_scenario(scenario)?;
            let control_loop = renet_controller::run_scenario(config, events).await;
            if session.dump_state {
                print_state(&control_loop);
            }
        }
        Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn print_state(control_loop: &renet_core::router::ControlLoop<renet_core::testing::MockSouthbound>) {
    let snapshot = renet_controller::dump_state(control_loop);
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("{json}"),
        Err(err) => log::warn!("failed to serialize diagnostics snapshot: {err}"),
    }
}
