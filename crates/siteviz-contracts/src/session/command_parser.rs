use std::collections::BTreeMap;

use serde_json::{Number, Value};

use super::command_registry::{
    CommandSpec, DRAW_COMMAND, MODE_COMMAND, NO_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionCommand {
    pub action: String,
    pub raw: String,
    pub args: BTreeMap<String, Value>,
}

impl SessionCommand {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            args: BTreeMap::new(),
        }
    }

    fn invalid(raw: &str, message: String) -> Self {
        let mut command = Self::new("invalid", raw);
        command
            .args
            .insert("error".to_string(), Value::String(message));
        command
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn arg_f64(&self, key: &str) -> Option<f64> {
        self.args.get(key).and_then(Value::as_f64)
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

fn parse_draw_args(arg: &str) -> Result<Vec<f64>, String> {
    let values = arg
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| format!("'{part}' is not a number"))
        })
        .collect::<Result<Vec<f64>, String>>()?;
    match values.len() {
        4 | 6 => Ok(values),
        count => Err(format!(
            "/draw takes left top width height [scale_x scale_y], got {count} values"
        )),
    }
}

fn number(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn parse_command(text: &str) -> SessionCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return SessionCommand::new("noop", text);
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        let mut command = SessionCommand::new("brief", text);
        command.args.insert(
            "text".to_string(),
            Value::String(raw_trimmed.to_string()),
        );
        return command;
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        return SessionCommand::invalid(text, "missing command name after '/'".to_string());
    }
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
        let mut parsed = SessionCommand::new(action, text);
        parsed.args.insert(
            "path".to_string(),
            Value::String(parse_single_path_arg(arg)),
        );
        return parsed;
    }

    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return SessionCommand::new(action, text);
    }

    if command == MODE_COMMAND.command {
        let mut parsed = SessionCommand::new(MODE_COMMAND.action, text);
        parsed
            .args
            .insert("mode".to_string(), Value::String(arg.to_ascii_lowercase()));
        return parsed;
    }

    if command == DRAW_COMMAND.command {
        let values = match parse_draw_args(arg) {
            Ok(values) => values,
            Err(message) => return SessionCommand::invalid(text, message),
        };
        let mut parsed = SessionCommand::new(DRAW_COMMAND.action, text);
        let keys = ["left", "top", "width", "height", "scale_x", "scale_y"];
        for (key, value) in keys.iter().zip(values) {
            parsed.args.insert((*key).to_string(), number(value));
        }
        return parsed;
    }

    let mut parsed = SessionCommand::new("unknown", text);
    parsed
        .args
        .insert("command".to_string(), Value::String(command));
    parsed
        .args
        .insert("arg".to_string(), Value::String(arg.to_string()));
    parsed
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_command;

    #[test]
    fn blank_input_is_noop() {
        assert_eq!(parse_command("   ").action, "noop");
    }

    #[test]
    fn plain_text_is_a_brief() {
        let command = parse_command("  a community centre by the river ");
        assert_eq!(command.action, "brief");
        assert_eq!(command.args["text"], json!("a community centre by the river"));
    }

    #[test]
    fn path_commands_accept_quoted_paths() {
        let load = parse_command("/load \"/tmp/site photo.jpg\"");
        assert_eq!(load.action, "load_image");
        assert_eq!(load.arg_str("path"), Some("/tmp/site photo.jpg"));

        let mask = parse_command("/MASK out/mask.png");
        assert_eq!(mask.action, "write_mask");
        assert_eq!(mask.args["path"], json!("out/mask.png"));

        assert_eq!(parse_command("/render").arg_str("path"), None);
    }

    #[test]
    fn draw_parses_four_or_six_numbers() {
        let draw = parse_command("/draw 100 50 200 100");
        assert_eq!(draw.action, "draw");
        assert_eq!(draw.arg_f64("left"), Some(100.0));
        assert_eq!(draw.arg_f64("height"), Some(100.0));
        assert_eq!(draw.arg_f64("scale_x"), None);

        let scaled = parse_command("/draw 1.5, 2, 3, 4, 1.25, 0.5");
        assert_eq!(scaled.arg_f64("scale_x"), Some(1.25));
        assert_eq!(scaled.arg_f64("scale_y"), Some(0.5));

        let negative = parse_command("/draw -10 -20 30 40");
        assert_eq!(negative.arg_f64("left"), Some(-10.0));
    }

    #[test]
    fn draw_rejects_bad_arity_and_values() {
        let short = parse_command("/draw 1 2 3");
        assert_eq!(short.action, "invalid");
        assert!(short.arg_str("error").unwrap_or("").contains("got 3 values"));

        let word = parse_command("/draw 1 2 three 4");
        assert_eq!(word.action, "invalid");

        assert_eq!(parse_command("/draw 1 2 NaN 4").action, "invalid");
    }

    #[test]
    fn mode_and_no_arg_commands() {
        let mode = parse_command("/mode Transform");
        assert_eq!(mode.action, "set_mode");
        assert_eq!(mode.args["mode"], json!("transform"));

        assert_eq!(parse_command("/clear").action, "clear_selection");
        assert_eq!(parse_command("/exit").action, "quit");
        assert_eq!(parse_command("/").action, "invalid");
    }

    #[test]
    fn unknown_command_keeps_argument() {
        let command = parse_command("/inpaint now please");
        assert_eq!(command.action, "unknown");
        assert_eq!(command.args["command"], json!("inpaint"));
        assert_eq!(command.args["arg"], json!("now please"));
    }
}
