//! Mochi Console Headless Runner
//!
//! Drives a console from a key script and prints what the renderer shows.
//! Used for testing and automation.
//!
//! Script format: characters are typed as-is, a newline commits the command
//! line, and `<up>`, `<down>`, `<left>`, `<right>`, `<bs>`, `<del>`, `<pgup>`,
//! `<pgdn>` press the named key. Any other `<...>` is typed literally.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use mochi_console::app::{self, Config};
use mochi_console::core::{Console, ConsoleSnapshot, EvalError, Renderer};
use mochi_console::input::{translate_key, InputAction, Key, Modifiers};
use mochi_console::renderer::{GlyphMetrics, SurfaceRenderer, TextSurface};

fn main() -> ExitCode {
    app::init_logging();

    let args: Vec<String> = std::env::args().collect();

    let mut columns: Option<u32> = None;
    let mut rows: Option<u32> = None;
    let mut input_file: Option<String> = None;
    let mut config_file: Option<PathBuf> = None;
    let mut output_format = OutputFormat::Text;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-w" | "--width" => {
                i += 1;
                columns = args.get(i).and_then(|v| v.parse().ok());
            },
            "-H" | "--height" => {
                i += 1;
                rows = args.get(i).and_then(|v| v.parse().ok());
            },
            "-f" | "--file" => {
                i += 1;
                input_file = args.get(i).cloned();
            },
            "-c" | "--config" => {
                i += 1;
                config_file = args.get(i).map(PathBuf::from);
            },
            "-j" | "--json" => {
                output_format = OutputFormat::Json;
            },
            "-h" | "--help" => {
                show_help = true;
            },
            _ => {
                // Treat as input file if no flag
                if input_file.is_none() && !args[i].starts_with('-') {
                    input_file = Some(args[i].clone());
                }
            },
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let mut config = match &config_file {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => Config::default(),
    };
    // Blinks would make the output depend on timing
    config.console.cursor_blink_ms = 0;

    let metrics = match config.renderer.metrics() {
        Ok(metrics) => metrics,
        Err(e) => {
            eprintln!("Error loading font: {}", e);
            return ExitCode::FAILURE;
        },
    };
    let (cell_width, line_height) = (metrics.cell_width(), metrics.line_height());
    if let Some(columns) = columns {
        config.renderer.viewport_width = columns * cell_width;
    }
    if let Some(rows) = rows {
        config.renderer.viewport_height = rows * line_height;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let script = match &input_file {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path, e);
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut data = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        },
    };

    let renderer = match SurfaceRenderer::spawn(
        TextSurface::new(cell_width, line_height),
        metrics,
        &config.renderer,
    ) {
        Ok(renderer) => Arc::new(renderer),
        Err(e) => {
            eprintln!("Error creating renderer: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let mut console = Console::with_config(&config.console, Some(Box::new(echo)));
    console.set_renderer(Some(Arc::clone(&renderer) as Arc<dyn Renderer>));

    let scroll_wait = config.renderer.scroll_duration()
        + Duration::from_secs_f64(2.0 / config.renderer.frame_rate as f64);
    for key in parse_script(&script) {
        match translate_key(key, Modifiers::default()) {
            Some(InputAction::Scroll(direction)) => {
                renderer.scroll(direction);
                std::thread::sleep(scroll_wait);
            },
            Some(InputAction::Quit) => break,
            Some(InputAction::ToggleSlide) => tracing::debug!("no overlay to slide"),
            Some(action) => {
                action.apply(&mut console);
            },
            None => tracing::debug!(?key, "key ignored"),
        }
    }
    renderer.sync();

    let result = match output_format {
        OutputFormat::Text => {
            println!("{}", renderer.with_state(|state| state.visible_text()));
            Ok(())
        },
        OutputFormat::Json => ConsoleSnapshot::from_console(&console)
            .to_json()
            .map(|json| println!("{}", json)),
    };

    console.set_renderer(None);
    renderer.terminate();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error serializing snapshot: {}", e);
            ExitCode::FAILURE
        },
    }
}

/// Built-in evaluator: echoes the command, `fail <msg>` reports an error
fn echo(console: &mut Console, command: &str) -> Result<(), EvalError> {
    if let Some(message) = command.strip_prefix("fail ") {
        return Err(EvalError::failed(message));
    }
    if !command.is_empty() {
        console.print(command);
    }
    Ok(())
}

/// Split a script into key presses
fn parse_script(script: &str) -> Vec<Key> {
    let mut keys = Vec::new();
    let mut rest = script;
    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(end) = rest.find('>') {
                let name = &rest[1..end];
                if let Some(key) = script_key(name) {
                    keys.push(key);
                    rest = &rest[end + 1..];
                    continue;
                }
            }
        }
        match c {
            '\n' => keys.push(Key::Enter),
            '\r' => {},
            c => keys.push(Key::Char(c)),
        }
        rest = &rest[c.len_utf8()..];
    }
    keys
}

fn script_key(name: &str) -> Option<Key> {
    match name {
        "up" | "down" | "left" | "right" | "bs" | "del" | "pgup" | "pgdn" => Key::from_name(name),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn print_help() {
    println!("Mochi Console Headless Runner");
    println!();
    println!("Usage: mochi-console-headless [OPTIONS] [SCRIPT]");
    println!();
    println!("Options:");
    println!("  -w, --width <N>      Viewport width in columns (default: from config)");
    println!("  -H, --height <N>     Viewport height in lines (default: from config)");
    println!("  -f, --file <PATH>    Read the key script from file");
    println!("  -c, --config <PATH>  Load configuration from a JSON file");
    println!("  -j, --json           Output a console snapshot as JSON");
    println!("  -h, --help           Show this help message");
    println!();
    println!("If no script is specified, reads from stdin.");
    println!("Key tokens: <up> <down> <left> <right> <bs> <del> <pgup> <pgdn>");
    println!();
    println!("Examples:");
    println!("  printf 'echo hi\\nfail oops\\n<up>' | mochi-console-headless -w 40 -H 5");
    println!("  mochi-console-headless --json script.txt > snapshot.json");
}
