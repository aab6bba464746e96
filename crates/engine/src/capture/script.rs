use tokio::process::Command;

/// Drop blank and `#` comment lines, trim the rest and join them with newlines.
pub fn normalize_script(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<shell> -c "exec <script>"`, so a kill reaches the log tool itself.
pub fn shell_command(shell: &str, script: &str) -> Command {
    let mut cmd = Command::new(shell);
    cmd.arg("-c").arg(format!("exec {script}"));
    cmd
}
