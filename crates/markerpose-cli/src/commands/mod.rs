pub mod capture;
pub mod detect;
pub mod generate;
pub mod normal;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A flag raised when the user hits Ctrl-C.
pub fn cancel_token() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let cancel_token = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler({
        let cancel_token = cancel_token.clone();
        move || {
            log::info!("received Ctrl-C, stopping");
            cancel_token.store(true, Ordering::SeqCst);
        }
    })?;
    Ok(cancel_token)
}

/// Parse three comma separated column names, e.g. `rx,ry,rz`.
pub fn parse_columns(value: &str) -> Result<[String; 3], String> {
    let cols = value.split(',').map(|c| c.trim().to_string()).collect::<Vec<_>>();
    <[String; 3]>::try_from(cols)
        .map_err(|cols| format!("expected three column names, got {}", cols.len()))
}

/// Parse a comma separated 3d vector, e.g. `0,0,-1`.
pub fn parse_vector(value: &str) -> Result<[f64; 3], String> {
    let values = value
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    <[f64; 3]>::try_from(values)
        .map_err(|values| format!("expected three values, got {}", values.len()))
}

pub fn default_columns() -> [String; 3] {
    ["rx".to_string(), "ry".to_string(), "rz".to_string()]
}
