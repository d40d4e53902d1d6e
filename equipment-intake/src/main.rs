use std::path::Path;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Non-interactive scan proof mode: decodes one image file, prints the value and exits 0/1.
    // Usage: --scan-smoke=<image path>
    if let Some(path) = args
        .iter()
        .find_map(|a| a.strip_prefix("--scan-smoke="))
        .filter(|v| !v.trim().is_empty())
    {
        equipment_intake::run_scan_smoke(Path::new(path.trim()), &args);
        return;
    }

    // Non-interactive TUI smoke test mode (for automated checks).
    // Renders a single frame for a specific step and exits 0.
    // Usage: --tui-smoke or --tui-smoke=reference|brand|entry
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--tui-smoke" || a.starts_with("--tui-smoke="))
    {
        let target = arg
            .split_once('=')
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.trim().is_empty());
        equipment_intake::run_tui_smoke(target);
        return;
    }

    // Interactive wizard. `--config <path>` and `--form 1|2` are read by the settings loader.
    equipment_intake::run_tui(&args);
}
