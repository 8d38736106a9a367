use slidecastd::{DaemonError, Slidecastd};

fn main() -> Result<(), DaemonError> {
    let daemon = Slidecastd::init().inspect_err(|err| eprintln!("{err}"))?;
    daemon.start().inspect_err(|err| log::error!("{err}"))
}
