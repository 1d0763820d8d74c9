use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use siteviz_contracts::events::EventWriter;
use siteviz_contracts::extract::{extract_concept_prompts, ConceptPrompt, Extraction};
use siteviz_contracts::geometry::{parse_canvas_shapes, DrawingMode, Mask, Selection};
use siteviz_contracts::session::{parse_command, SessionCommand, SESSION_HELP_COMMANDS};
use siteviz_engine::imaging::{ensure_parent, load_mask_image, load_source_image, save_mask};
use siteviz_engine::{
    default_provider_registry, render_concepts, EngineConfig, SessionEvent, SessionOutcome,
    SiteSession,
};

#[derive(Debug, Parser)]
#[command(
    name = "siteviz",
    version,
    about = "Site selection masks and concept rendering"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the display-sized preview of a site image.
    Preview(PreviewArgs),
    /// Rasterise a display-space rectangle into a full-resolution mask.
    Mask(MaskArgs),
    /// Pull concept prompt records out of a model transcript.
    Extract(ExtractArgs),
    /// Inpaint every extracted concept into its own folder.
    Render(RenderArgs),
    /// Interactive selection session driven by slash commands.
    Session(SessionArgs),
}

#[derive(Debug, Parser)]
struct LimitArgs {
    #[arg(long)]
    max_width: Option<u32>,
    #[arg(long)]
    max_pixels: Option<u64>,
}

#[derive(Debug, Parser)]
struct PreviewArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[command(flatten)]
    limits: LimitArgs,
}

#[derive(Debug, Parser)]
struct MaskArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long, allow_hyphen_values = true)]
    left: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    top: Option<f64>,
    #[arg(long)]
    width: Option<f64>,
    #[arg(long)]
    height: Option<f64>,
    #[arg(long, default_value_t = 1.0)]
    scale_x: f64,
    #[arg(long, default_value_t = 1.0)]
    scale_y: f64,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    overlay: Option<PathBuf>,
    #[command(flatten)]
    limits: LimitArgs,
}

#[derive(Debug, Parser)]
struct ExtractArgs {
    /// Transcript file, or `-` for stdin.
    #[arg(long)]
    transcript: PathBuf,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct RenderArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    mask: PathBuf,
    /// Transcript or JSON list holding the concept prompt records.
    #[arg(long)]
    prompts: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    images: Option<u32>,
    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    max_pixels: Option<u64>,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    images: Option<u32>,
    #[command(flatten)]
    limits: LimitArgs,
}

const EXIT_NOT_FOUND: i32 = 2;
const EXIT_UNPARSEABLE: i32 = 3;
const GENERATED_DIR_NAME: &str = "generated_images";

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("siteviz error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Preview(args) => run_preview(args),
        Command::Mask(args) => run_mask(args),
        Command::Extract(args) => run_extract(args),
        Command::Render(args) => run_render(args),
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
    }
}

fn engine_config(
    limits: Option<&LimitArgs>,
    images: Option<u32>,
    provider: Option<&str>,
) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env()?;
    if let Some(limits) = limits {
        if let Some(max_width) = limits.max_width {
            config.max_display_width = max_width;
        }
        if let Some(max_pixels) = limits.max_pixels {
            config.max_source_pixels = max_pixels;
        }
    }
    if let Some(images) = images {
        config.images_per_concept = images;
    }
    if let Some(provider) = provider.map(str::trim).filter(|value| !value.is_empty()) {
        config.provider = provider.to_ascii_lowercase();
    }
    config.validate()?;
    Ok(config)
}

fn run_preview(args: PreviewArgs) -> Result<i32> {
    let config = engine_config(Some(&args.limits), None, None)?;
    let mut session = SiteSession::new(config, EventWriter::disabled("preview"));
    let transform = session.load_image(&args.image)?;
    ensure_parent(&args.out)?;
    session
        .preview()?
        .save(&args.out)
        .with_context(|| format!("failed to save {}", args.out.display()))?;
    println!(
        "Preview {}x{} (scale {:.4}) written to {}",
        transform.display_width,
        transform.display_height,
        transform.scaling_factor,
        args.out.display()
    );
    Ok(0)
}

fn mask_selection(args: &MaskArgs) -> Result<Option<Selection>> {
    match (args.left, args.top, args.width, args.height) {
        (None, None, None, None) => Ok(None),
        (Some(left), Some(top), Some(width), Some(height)) => Ok(Some(
            Selection::new(left, top, width, height).with_scale(args.scale_x, args.scale_y),
        )),
        _ => bail!("--left, --top, --width and --height must be given together"),
    }
}

fn run_mask(args: MaskArgs) -> Result<i32> {
    let selection = mask_selection(&args)?;
    let config = engine_config(Some(&args.limits), None, None)?;
    let mut session = SiteSession::new(config, EventWriter::disabled("mask"));
    session.load_image(&args.image)?;
    if let Some(selection) = selection {
        session.set_selection(selection)?;
    }

    let mask = session.current_mask()?;
    save_mask(&mask, &args.out)?;
    if let Some(overlay_path) = args.overlay.as_ref() {
        ensure_parent(overlay_path)?;
        session
            .overlay()?
            .save(overlay_path)
            .with_context(|| format!("failed to save {}", overlay_path.display()))?;
    }
    println!("{}", describe_mask(&mask));
    println!("Mask written to {}", args.out.display());
    Ok(0)
}

fn run_extract(args: ExtractArgs) -> Result<i32> {
    let transcript = read_transcript(&args.transcript)?;
    let extraction = extract_concept_prompts(&transcript);
    for err in extraction.errors() {
        eprintln!("{err}");
    }
    let code = extract_exit_code(&extraction);
    if code == EXIT_NOT_FOUND {
        eprintln!("no concept prompt list found");
        return Ok(code);
    }

    let records = extraction.records();
    let rendered = serde_json::to_string_pretty(&records)?;
    match args.out.as_ref() {
        Some(out) => {
            ensure_parent(out)?;
            fs::write(out, format!("{rendered}\n"))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("{} concept(s) written to {}", records.len(), out.display());
        }
        None => println!("{rendered}"),
    }
    Ok(code)
}

fn extract_exit_code(extraction: &Extraction) -> i32 {
    if extraction.is_not_found() {
        EXIT_NOT_FOUND
    } else if extraction.records().is_empty() {
        EXIT_UNPARSEABLE
    } else {
        0
    }
}

fn run_render(args: RenderArgs) -> Result<i32> {
    let mut config = engine_config(None, args.images, args.provider.as_deref())?;
    if let Some(max_pixels) = args.max_pixels {
        config.max_source_pixels = max_pixels;
    }
    let registry = default_provider_registry();
    let provider = registry.require(&config.provider)?;

    let source = load_source_image(&args.image, config.max_source_pixels)?;
    let mask = load_mask_image(&args.mask)?;
    let prompts = load_prompts(&args.prompts)?;

    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventWriter::new(events_path, session_id_for(&args.out));
    let summary = render_concepts(
        provider,
        &source,
        &mask,
        &prompts,
        config.images_per_concept,
        &args.out,
        &events,
    )?;
    for concept in &summary.concepts {
        println!(
            "{}: {} image(s) in {}",
            concept.concept,
            concept.images.len(),
            args.out.join(&concept.folder).display()
        );
    }
    println!(
        "Rendered {} image(s) with {}",
        summary.total_images(),
        summary.provider
    );
    Ok(0)
}

fn run_session(args: SessionArgs) -> Result<()> {
    let config = engine_config(Some(&args.limits), args.images, args.provider.as_deref())?;
    let registry = default_provider_registry();
    registry.require(&config.provider)?;
    let mut session = SiteSession::open(&args.out, args.events.clone(), config)?;
    let mut prompts: Vec<ConceptPrompt> = Vec::new();

    let stdin = io::stdin();
    let mut line = String::new();
    println!("Siteviz session started. Type /help for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let command = parse_command(line.trim_end_matches(['\n', '\r']));
        match command.action.as_str() {
            "noop" => continue,
            "quit" => break,
            "help" => println!("Commands: {}", SESSION_HELP_COMMANDS.join(" ")),
            "invalid" => println!(
                "Invalid command: {}",
                command.arg_str("error").unwrap_or("unreadable input")
            ),
            "unknown" => println!(
                "Unknown command /{}",
                command.arg_str("command").unwrap_or_default()
            ),
            _ => {
                let outcome = run_session_command(
                    &mut session,
                    &command,
                    &mut prompts,
                    &registry,
                    &args.out,
                );
                if let Err(err) = outcome {
                    println!("{} failed: {err:#}", command.action);
                    session.emit_event(
                        "command_failed",
                        json_object(json!({
                            "action": command.action,
                            "raw": command.raw,
                            "error": format!("{err:#}"),
                        })),
                    )?;
                }
            }
        }
    }

    session.emit_event("session_finished", Map::new())?;
    Ok(())
}

fn run_session_command(
    session: &mut SiteSession,
    command: &SessionCommand,
    prompts: &mut Vec<ConceptPrompt>,
    registry: &siteviz_engine::InpaintProviderRegistry,
    out_dir: &Path,
) -> Result<()> {
    match command.action.as_str() {
        "brief" => {
            session.set_brief(command.arg_str("text").unwrap_or_default());
            println!("Brief set.");
        }
        "load_image" => {
            let path = required_path(command)?;
            let transform = session.load_image(&path)?;
            println!(
                "Loaded {}x{}; preview is {}x{} (scale {:.4})",
                transform.source_width,
                transform.source_height,
                transform.display_width,
                transform.display_height,
                transform.scaling_factor
            );
        }
        "draw" => {
            let selection = selection_from_command(command)?;
            let outcome = session.handle(SessionEvent::Draw(selection))?;
            print_outcome(&outcome);
        }
        "apply_canvas" => {
            let path = required_path(command)?;
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let payload: Value = serde_json::from_str(&raw)
                .with_context(|| format!("invalid canvas JSON in {}", path.display()))?;
            let shapes = parse_canvas_shapes(&payload)?;
            let outcome = session.handle(SessionEvent::Canvas(shapes))?;
            print_outcome(&outcome);
        }
        "clear_selection" => {
            let outcome = session.handle(SessionEvent::Clear)?;
            print_outcome(&outcome);
        }
        "set_mode" => {
            let mode: DrawingMode = command
                .arg_str("mode")
                .unwrap_or_default()
                .parse()
                .map_err(anyhow::Error::msg)?;
            let outcome = session.handle(SessionEvent::Mode(mode))?;
            print_outcome(&outcome);
        }
        "write_mask" => {
            let path = required_path(command)?;
            if let SessionOutcome::Submitted(mask) = session.handle(SessionEvent::Submit)? {
                save_mask(&mask, &path)?;
                println!("{}", describe_mask(&mask));
                println!("Mask written to {}", path.display());
            }
        }
        "write_overlay" => {
            let path = required_path(command)?;
            ensure_parent(&path)?;
            session
                .overlay()?
                .save(&path)
                .with_context(|| format!("failed to save {}", path.display()))?;
            println!("Overlay written to {}", path.display());
        }
        "write_preview" => {
            let path = required_path(command)?;
            ensure_parent(&path)?;
            session
                .preview()?
                .save(&path)
                .with_context(|| format!("failed to save {}", path.display()))?;
            println!("Preview written to {}", path.display());
        }
        "extract_prompts" => {
            let path = required_path(command)?;
            let extraction = extract_concept_prompts(&read_transcript(&path)?);
            for err in extraction.errors() {
                println!("{err}");
            }
            if extraction.is_not_found() {
                println!("No concept prompt list found in {}", path.display());
                return Ok(());
            }
            *prompts = extraction.records();
            session.emit_event(
                "prompts_extracted",
                json_object(json!({
                    "path": path.to_string_lossy().to_string(),
                    "spans": extraction.spans().len(),
                    "errors": extraction.errors().len(),
                    "concepts": prompts.iter().map(|prompt| prompt.concept.clone()).collect::<Vec<_>>(),
                })),
            )?;
            for prompt in prompts.iter() {
                println!("- {}", prompt.concept);
            }
        }
        "render_concepts" => {
            if let Some(path) = optional_path(command) {
                *prompts = load_prompts(&path)?;
            }
            if prompts.is_empty() {
                bail!("no concept prompts loaded; use /extract <path> first");
            }
            let provider = registry.require(&session.config().provider)?;
            let target = out_dir.join(GENERATED_DIR_NAME);
            let summary = session.render(provider, prompts, &target)?;
            println!(
                "Rendered {} image(s) for {} concept(s) into {}",
                summary.total_images(),
                summary.concepts.len(),
                target.display()
            );
        }
        "status" => print_status(session, prompts.len())?,
        other => bail!("unhandled action '{other}'"),
    }
    Ok(())
}

fn print_outcome(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Selection { change, region } => match region {
            Some(region) => println!(
                "Selection {}: source pixels x {}..{}, y {}..{}",
                change.as_str(),
                region.left,
                region.right,
                region.top,
                region.bottom
            ),
            None => println!("Selection {}", change.as_str()),
        },
        SessionOutcome::ModeChanged(mode) => println!("Drawing mode: {mode}"),
        SessionOutcome::Submitted(mask) => println!("{}", describe_mask(mask)),
    }
}

fn print_status(session: &SiteSession, prompt_count: usize) -> Result<()> {
    match session.transform() {
        Some(transform) => println!(
            "Image: {}x{} (preview {}x{})",
            transform.source_width,
            transform.source_height,
            transform.display_width,
            transform.display_height
        ),
        None => println!("Image: none"),
    }
    match session.selection() {
        Some(selection) => println!(
            "Selection: left {} top {} width {} height {}",
            selection.left,
            selection.top,
            selection.effective_width(),
            selection.effective_height()
        ),
        None => println!("Selection: none"),
    }
    println!("Mode: {}", session.mode());
    if session.has_image() {
        println!("{}", describe_mask(&session.current_mask()?));
    }
    println!("Brief: {}", session.brief().unwrap_or("(none)"));
    println!("Concepts loaded: {prompt_count}");
    Ok(())
}

fn describe_mask(mask: &Mask) -> String {
    match mask.selected_bounds() {
        Some(bounds) => format!(
            "Mask {}x{}: {} pixel(s) selected in x {}..{}, y {}..{}",
            mask.width(),
            mask.height(),
            mask.selected_count(),
            bounds.left,
            bounds.right,
            bounds.top,
            bounds.bottom
        ),
        None => format!("Mask {}x{}: empty", mask.width(), mask.height()),
    }
}

fn selection_from_command(command: &SessionCommand) -> Result<Selection> {
    let value = |key: &str| {
        command
            .arg_f64(key)
            .with_context(|| format!("/draw is missing {key}"))
    };
    let selection = Selection::new(value("left")?, value("top")?, value("width")?, value("height")?);
    Ok(match (command.arg_f64("scale_x"), command.arg_f64("scale_y")) {
        (Some(scale_x), Some(scale_y)) => selection.with_scale(scale_x, scale_y),
        _ => selection,
    })
}

fn optional_path(command: &SessionCommand) -> Option<PathBuf> {
    command
        .arg_str("path")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn required_path(command: &SessionCommand) -> Result<PathBuf> {
    match optional_path(command) {
        Some(path) => Ok(path),
        None => bail!("{} requires a path", command.raw.trim()),
    }
}

fn read_transcript(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_prompts(path: &Path) -> Result<Vec<ConceptPrompt>> {
    let extraction = extract_concept_prompts(&read_transcript(path)?);
    let records = extraction.records();
    if records.is_empty() {
        let detail = extraction
            .errors()
            .first()
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no concept prompt list found".to_string());
        bail!("no usable concept prompts in {}: {detail}", path.display());
    }
    Ok(records)
}

fn session_id_for(out_dir: &Path) -> String {
    out_dir
        .file_name()
        .and_then(|value| value.to_str())
        .filter(|value| !value.is_empty())
        .unwrap_or("render")
        .to_string()
}

fn json_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use clap::Parser;
    use siteviz_contracts::extract::extract_concept_prompts;
    use siteviz_contracts::geometry::{Mask, PixelRect, Selection};
    use siteviz_contracts::session::parse_command;

    use image::{DynamicImage, Rgb, RgbImage};
    use siteviz_contracts::extract::ConceptPrompt;
    use siteviz_engine::imaging::load_mask_image;
    use siteviz_engine::{default_provider_registry, EngineConfig, SiteSession};

    use super::{
        describe_mask, extract_exit_code, load_prompts, mask_selection, run_session_command,
        selection_from_command, session_id_for, Cli, Command, EXIT_NOT_FOUND, EXIT_UNPARSEABLE,
        GENERATED_DIR_NAME,
    };

    fn run_script(
        session: &mut SiteSession,
        prompts: &mut Vec<ConceptPrompt>,
        out_dir: &Path,
        lines: &[String],
    ) -> anyhow::Result<()> {
        let registry = default_provider_registry();
        for line in lines {
            run_session_command(session, &parse_command(line), prompts, &registry, out_dir)?;
        }
        Ok(())
    }

    #[test]
    fn scripted_session_draws_clears_and_writes_masks() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let run_dir = temp.path().join("run");
        let site = temp.path().join("site.png");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 200, Rgb([80, 90, 100]))).save(&site)?;
        let transcript = temp.path().join("transcript.txt");
        std::fs::write(
            &transcript,
            r#"Concepts: [{"concept": "Pavilion", "positive": "timber roof", "negative": "glass"}]"#,
        )?;

        let config = EngineConfig {
            max_display_width: 100,
            images_per_concept: 1,
            ..EngineConfig::default()
        };
        let mut session = SiteSession::open(&run_dir, None, config)?;
        let mut prompts = Vec::new();
        let cleared = temp.path().join("cleared.png");
        let drawn = temp.path().join("drawn.png");

        run_script(
            &mut session,
            &mut prompts,
            &run_dir,
            &[
                format!("/load \"{}\"", site.display()),
                "/draw 10 5 20 10".to_string(),
                "/clear".to_string(),
                format!("/mask \"{}\"", cleared.display()),
            ],
        )?;
        let blank = load_mask_image(&cleared)?;
        assert_eq!(blank.dims(), (400, 200));
        assert!(blank.is_blank());

        run_script(
            &mut session,
            &mut prompts,
            &run_dir,
            &[
                "/draw 10 5 20 10".to_string(),
                "/mode move".to_string(),
                format!("/mask \"{}\"", drawn.display()),
                format!("/extract \"{}\"", transcript.display()),
                "/render".to_string(),
                "/status".to_string(),
            ],
        )?;
        let mask = load_mask_image(&drawn)?;
        assert_eq!(
            mask.selected_bounds(),
            Some(PixelRect {
                left: 40,
                top: 20,
                right: 120,
                bottom: 60,
            })
        );
        assert_eq!(prompts.len(), 1);
        let generated = run_dir.join(GENERATED_DIR_NAME);
        assert!(generated.join("summary.json").exists());
        assert!(generated.join("Pavilion").join("generated_image_0.png").exists());

        let events = std::fs::read_to_string(run_dir.join("events.jsonl"))?;
        assert!(events.contains("\"type\":\"selection_cleared\""));
        assert!(events.contains("\"type\":\"mode_changed\""));
        assert!(events.contains("\"type\":\"render_finished\""));
        Ok(())
    }

    #[test]
    fn session_commands_fail_without_prerequisites() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = SiteSession::open(temp.path().join("run"), None, EngineConfig::default())?;
        let mut prompts = Vec::new();
        let registry = default_provider_registry();
        for line in ["/draw 1 2 3 4", "/mask", "/render", "/mode lasso"] {
            let result = run_session_command(
                &mut session,
                &parse_command(line),
                &mut prompts,
                &registry,
                temp.path(),
            );
            assert!(result.is_err(), "{line} should fail");
        }
        Ok(())
    }

    fn mask_args(extra: &[&str]) -> anyhow::Result<super::MaskArgs> {
        let mut argv = vec!["siteviz", "mask", "--image", "site.png", "--out", "mask.png"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv)?.command {
            Command::Mask(args) => Ok(args),
            other => anyhow::bail!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn mask_flags_build_a_scaled_selection() -> anyhow::Result<()> {
        let args = mask_args(&[
            "--left", "-5", "--top", "10", "--width", "20", "--height", "30", "--scale-x", "2",
        ])?;
        let selection = mask_selection(&args)?;
        assert_eq!(
            selection,
            Some(Selection::new(-5.0, 10.0, 20.0, 30.0).with_scale(2.0, 1.0))
        );
        Ok(())
    }

    #[test]
    fn mask_without_rectangle_is_blank_and_partial_is_rejected() -> anyhow::Result<()> {
        assert_eq!(mask_selection(&mask_args(&[])?)?, None);
        assert!(mask_selection(&mask_args(&["--left", "1", "--top", "2"])?).is_err());
        Ok(())
    }

    #[test]
    fn draw_command_becomes_selection() -> anyhow::Result<()> {
        let plain = selection_from_command(&parse_command("/draw 1 2 3 4"))?;
        assert_eq!(plain, Selection::new(1.0, 2.0, 3.0, 4.0));
        let scaled = selection_from_command(&parse_command("/draw 1,2,3,4,0.5,2"))?;
        assert_eq!(scaled, Selection::new(1.0, 2.0, 3.0, 4.0).with_scale(0.5, 2.0));
        Ok(())
    }

    #[test]
    fn extract_exit_codes() {
        let found = extract_concept_prompts(
            r#"[{"concept": "Grove", "positive": "trees", "negative": "asphalt"}]"#,
        );
        assert_eq!(extract_exit_code(&found), 0);
        assert_eq!(
            extract_exit_code(&extract_concept_prompts("no list here")),
            EXIT_NOT_FOUND
        );
        assert_eq!(
            extract_exit_code(&extract_concept_prompts(r#"[{"concept": "only"}]"#)),
            EXIT_UNPARSEABLE
        );
    }

    #[test]
    fn prompts_load_from_transcripts() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let good = temp.path().join("good.txt");
        std::fs::write(
            &good,
            "Final:\n[ {\"concept\": \"Terraces\", \"positive\": \"stepped gardens\", \"negative\": \"flat roof\"} ]\n",
        )?;
        let prompts = load_prompts(&good)?;
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].concept, "Terraces");

        let bad = temp.path().join("bad.txt");
        std::fs::write(&bad, "nothing useful")?;
        let err = load_prompts(&bad).err().map(|err| err.to_string()).unwrap_or_default();
        assert!(err.contains("no concept prompt list found"));
        Ok(())
    }

    #[test]
    fn mask_description() {
        let mask = Mask::from_region(
            10,
            8,
            PixelRect {
                left: 1,
                top: 2,
                right: 4,
                bottom: 6,
            },
        );
        assert_eq!(
            describe_mask(&mask),
            "Mask 10x8: 12 pixel(s) selected in x 1..4, y 2..6"
        );
        assert_eq!(describe_mask(&Mask::empty(3, 3)), "Mask 3x3: empty");
    }

    #[test]
    fn session_id_follows_output_dir() {
        assert_eq!(session_id_for(&PathBuf::from("/tmp/runs/site-a")), "site-a");
        assert_eq!(session_id_for(Path::new("/")), "render");
    }
}
