use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use tour_rs::core::{BoundingBox, TooltipSize, Viewport};
use tour_rs::host::{ElementId, HeadlessHost};
use tour_rs::{
    CursorHandle, EngineState, TourCommand, TourEngine, TourEngineConfig, TourStep, TourSteps,
};

const USAGE: &str = "usage: tour_trace --input <path> --output <path>";
const SETTLE_ROUNDS: usize = 16;

#[derive(Debug)]
struct CliArgs {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TraceScenario {
    #[serde(default)]
    name: String,
    viewport: Viewport,
    #[serde(default)]
    config: TourEngineConfig,
    steps: Vec<TourStep>,
    #[serde(default)]
    elements: Vec<ElementSpec>,
    script: Vec<ScriptAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ElementSpec {
    selector: String,
    rect: BoundingBox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ScriptAction {
    Command { command: TourCommand },
    Insert { selector: String, rect: BoundingBox },
    Remove { selector: String },
    SetRect { selector: String, rect: BoundingBox },
    Scroll { dx: f64, dy: f64 },
    ResizeViewport { viewport: Viewport },
    TooltipSize { size: Option<TooltipSize> },
    Frame,
    Settle,
    Advance { ms: u64 },
}

#[derive(Debug, Clone, Serialize)]
struct TraceOutput {
    name: String,
    entries: Vec<TraceEntry>,
    focus_requests: usize,
    frames_run: usize,
}

#[derive(Debug, Clone, Serialize)]
struct TraceEntry {
    action: ScriptAction,
    revision: u64,
    state: EngineState,
}

/// Latest element per selector, so `remove` and `set_rect` address what the
/// script inserted last.
struct ElementRegistry {
    by_selector: HashMap<String, ElementId>,
}

impl ElementRegistry {
    fn resolve(&self, selector: &str) -> Result<ElementId, String> {
        self.by_selector
            .get(selector)
            .copied()
            .ok_or_else(|| format!("unknown element `{selector}`"))
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    let _ = tour_rs::telemetry::init_default_tracing();
    let raw = fs::read_to_string(&args.input)
        .map_err(|err| format!("failed to read `{}`: {err}", args.input.display()))?;
    let scenario: TraceScenario =
        serde_json::from_str(&raw).map_err(|err| format!("invalid json: {err}"))?;
    let trace = replay_scenario(scenario)?;
    write_json(&args.output, &trace)
}

fn replay_scenario(scenario: TraceScenario) -> Result<TraceOutput, String> {
    let host = Rc::new(HeadlessHost::new(scenario.viewport));
    let mut registry = mount_elements(&host, &scenario.elements);
    host.flush_notifications();

    let steps = TourSteps::new(scenario.steps).map_err(|err| err.to_string())?;
    let cursor = CursorHandle::new();
    let engine = TourEngine::new(Rc::clone(&host), cursor, steps, scenario.config)
        .map_err(|err| err.to_string())?;

    let mut entries = Vec::with_capacity(scenario.script.len());
    for action in scenario.script {
        apply_action(&host, &engine, &mut registry, &action)?;
        entries.push(TraceEntry {
            action,
            revision: engine.state_revision(),
            state: engine.state(),
        });
    }

    let stats = host.stats();
    Ok(TraceOutput {
        name: scenario.name,
        entries,
        focus_requests: stats.focus_requests,
        frames_run: stats.frames_run,
    })
}

fn mount_elements(host: &HeadlessHost, elements: &[ElementSpec]) -> ElementRegistry {
    let mut registry = ElementRegistry {
        by_selector: HashMap::new(),
    };
    for element in elements {
        let id = host.insert_element(element.selector.clone(), element.rect);
        registry.by_selector.insert(element.selector.clone(), id);
    }
    registry
}

fn apply_action(
    host: &HeadlessHost,
    engine: &TourEngine<HeadlessHost>,
    registry: &mut ElementRegistry,
    action: &ScriptAction,
) -> Result<(), String> {
    match action {
        ScriptAction::Command { command } => {
            engine.dispatch(*command);
        }
        ScriptAction::Insert { selector, rect } => {
            let id = host.insert_element(selector.clone(), *rect);
            registry.by_selector.insert(selector.clone(), id);
        }
        ScriptAction::Remove { selector } => {
            let id = registry.resolve(selector)?;
            host.remove_element(id);
            registry.by_selector.remove(selector);
        }
        ScriptAction::SetRect { selector, rect } => {
            host.set_rect(registry.resolve(selector)?, *rect);
        }
        ScriptAction::Scroll { dx, dy } => host.scroll_by(*dx, *dy),
        ScriptAction::ResizeViewport { viewport } => host.resize_viewport(*viewport),
        ScriptAction::TooltipSize { size } => {
            host.set_tooltip_size(*size);
            engine.request_recompute();
        }
        ScriptAction::Frame => {
            host.run_frame();
        }
        ScriptAction::Settle => {
            host.settle(SETTLE_ROUNDS);
        }
        ScriptAction::Advance { ms } => {
            host.advance_time(Duration::from_millis(*ms));
        }
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &PathBuf, value: &T) -> Result<(), String> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| format!("failed to serialize json: {err}"))?;
    fs::write(path, payload).map_err(|err| format!("failed to write `{}`: {err}", path.display()))
}

fn parse_args() -> Result<CliArgs, String> {
    let mut args = std::env::args().skip(1);
    let mut input = None::<PathBuf>;
    let mut output = None::<PathBuf>;

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--input" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --input".to_owned())?;
                input = Some(PathBuf::from(value));
            }
            "--output" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --output".to_owned())?;
                output = Some(PathBuf::from(value));
            }
            "--help" | "-h" => return Err(USAGE.to_owned()),
            _ => return Err(format!("unknown argument `{flag}`")),
        }
    }

    let input = input.ok_or_else(|| "missing --input".to_owned())?;
    let output = output.ok_or_else(|| "missing --output".to_owned())?;
    Ok(CliArgs { input, output })
}

#[cfg(test)]
mod tests {
    use super::{ElementSpec, ScriptAction, apply_action, mount_elements};
    use std::rc::Rc;
    use tour_rs::core::{BoundingBox, Viewport};
    use tour_rs::host::{ElementLookup, HeadlessHost};
    use tour_rs::{CursorHandle, TourEngine, TourEngineConfig, TourSteps};

    #[test]
    fn registry_tracks_latest_element_for_repeated_selectors() {
        let host = Rc::new(HeadlessHost::new(Viewport::new(800, 600)));
        let first = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        let second = BoundingBox::new(200.0, 200.0, 80.0, 40.0);
        let registry = mount_elements(
            &host,
            &[
                ElementSpec {
                    selector: ".card".to_owned(),
                    rect: first,
                },
                ElementSpec {
                    selector: ".card".to_owned(),
                    rect: second,
                },
            ],
        );

        let id = registry.resolve(".card").expect("registered");
        assert_eq!(host.bounding_box(&id), second);
    }

    #[test]
    fn removing_a_repeated_selector_removes_the_latest_element() {
        let host = Rc::new(HeadlessHost::new(Viewport::new(800, 600)));
        let first = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        let mut registry = mount_elements(
            &host,
            &[
                ElementSpec {
                    selector: ".card".to_owned(),
                    rect: first,
                },
                ElementSpec {
                    selector: ".card".to_owned(),
                    rect: BoundingBox::new(200.0, 200.0, 80.0, 40.0),
                },
            ],
        );
        let engine = TourEngine::new(
            Rc::clone(&host),
            CursorHandle::new(),
            TourSteps::default(),
            TourEngineConfig::default(),
        )
        .expect("engine");

        apply_action(
            &host,
            &engine,
            &mut registry,
            &ScriptAction::Remove {
                selector: ".card".to_owned(),
            },
        )
        .expect("remove");

        let remaining = host.find_one(".card").expect("first element stays mounted");
        assert_eq!(host.bounding_box(&remaining), first);
        assert!(registry.resolve(".card").is_err());
    }
}
