#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "load",
        action: "load_image",
    },
    CommandSpec {
        command: "canvas",
        action: "apply_canvas",
    },
    CommandSpec {
        command: "mask",
        action: "write_mask",
    },
    CommandSpec {
        command: "overlay",
        action: "write_overlay",
    },
    CommandSpec {
        command: "preview",
        action: "write_preview",
    },
    CommandSpec {
        command: "extract",
        action: "extract_prompts",
    },
    CommandSpec {
        command: "render",
        action: "render_concepts",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "clear",
        action: "clear_selection",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const MODE_COMMAND: CommandSpec = CommandSpec {
    command: "mode",
    action: "set_mode",
};

pub(crate) const DRAW_COMMAND: CommandSpec = CommandSpec {
    command: "draw",
    action: "draw",
};

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/load",
    "/draw",
    "/canvas",
    "/clear",
    "/mode",
    "/mask",
    "/overlay",
    "/preview",
    "/extract",
    "/render",
    "/status",
    "/help",
    "/quit",
];
