//! `vigil hook <role>` — read stdin, dispatch, honor the exit-code contract.

use std::io::Read;

use vigil_bridge::{hook_entrypoint, Role};

pub fn run(role: Role) -> anyhow::Result<()> {
    let mut stdin_buf = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut stdin_buf) {
        debug_log(&format!("STDIN READ ERROR: {e}"));
        return Ok(());
    }

    let head: String = stdin_buf.chars().take(200).collect();
    debug_log(&format!(
        "role={} stdin({} bytes): {}",
        role.as_str(),
        stdin_buf.len(),
        head
    ));

    let result = hook_entrypoint(role, &stdin_buf);

    if let Some(output) = &result.stdout {
        debug_log(&format!("OK output({} bytes)", output.len()));
        print!("{output}");
    }
    if let Some(warning) = &result.stderr {
        debug_log(&format!("WARNING: {warning}"));
        eprintln!("{warning}");
        // Exit 1 = non-blocking warning; the host shows stderr to the user
        // but does not feed it to the model or block the conversation.
        std::process::exit(1);
    }
    if result.stdout.is_none() {
        debug_log("OK (no output)");
    }
    Ok(())
}

fn debug_log(msg: &str) {
    if std::env::var_os("VIGIL_DEBUG").is_none() {
        return;
    }
    use std::io::Write;
    let log_path = std::env::temp_dir().join("vigil-hook-debug.log");
    if let Ok(mut f) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let ts = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        let _ = writeln!(f, "[{ts}] {msg}");
    }
}
