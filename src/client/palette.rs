/// A slash command offered while the input starts with `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSuggestion {
    pub label: &'static str,
    pub description: &'static str,
    pub prefix: &'static str,
}

pub static COMMANDS: [CommandSuggestion; 4] = [
    CommandSuggestion {
        label: "Clone UI",
        description: "Generate a UI from a screenshot",
        prefix: "/clone",
    },
    CommandSuggestion {
        label: "Import Figma",
        description: "Import a design from Figma",
        prefix: "/figma",
    },
    CommandSuggestion {
        label: "Create Page",
        description: "Generate a new web page",
        prefix: "/page",
    },
    CommandSuggestion {
        label: "Improve",
        description: "Improve existing UI design",
        prefix: "/improve",
    },
];

/// Starter prompts grouped by topic, picked whole into the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptCategory {
    pub name: &'static str,
    pub prompts: [&'static str; 5],
}

pub static PROMPT_CATEGORIES: [PromptCategory; 3] = [
    PromptCategory {
        name: "learn",
        prompts: [
            "Explain the Big Bang theory",
            "How does photosynthesis work?",
            "What are black holes?",
            "Explain quantum computing",
            "How does the human brain work?",
        ],
    },
    PromptCategory {
        name: "code",
        prompts: [
            "Create a React component for a todo list",
            "Write a Python function to sort a list",
            "How to implement authentication in Next.js",
            "Explain async/await in JavaScript",
            "Create a CSS animation for a button",
        ],
    },
    PromptCategory {
        name: "write",
        prompts: [
            "Write a professional email to a client",
            "Create a product description for a smartphone",
            "Draft a blog post about AI",
            "Write a creative story about space exploration",
            "Create a social media post about sustainability",
        ],
    },
];

pub fn prompt_category(name: &str) -> Option<&'static PromptCategory> {
    PROMPT_CATEGORIES.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteKey {
    Up,
    Down,
    Accept,
    Escape,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPalette {
    visible: bool,
    active: Option<usize>,
}

impl CommandPalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn active_command(&self) -> Option<&'static CommandSuggestion> {
        self.active.and_then(|i| COMMANDS.get(i))
    }

    /// Commands whose prefix starts with `input`, for display.
    pub fn matches(input: &str) -> impl Iterator<Item = (usize, &'static CommandSuggestion)> + '_ {
        COMMANDS.iter().enumerate().filter(move |(_, cmd)| cmd.prefix.starts_with(input))
    }

    /// Re-evaluates visibility and highlight after the input text changed.
    pub fn update(&mut self, input: &str) {
        if input.starts_with('/') && !input.contains(' ') {
            self.visible = true;
            self.active = COMMANDS.iter().position(|cmd| cmd.prefix.starts_with(input));
        } else {
            self.visible = false;
        }
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    /// Applies a navigation key. Returns the accepted command, if any; the
    /// caller owns the input text and replaces it.
    pub fn handle_key(&mut self, key: PaletteKey) -> Option<&'static CommandSuggestion> {
        let last = COMMANDS.len() - 1;
        match key {
            PaletteKey::Down => {
                self.active = match self.active {
                    Some(i) if i < last => Some(i + 1),
                    _ => Some(0),
                };
                None
            }
            PaletteKey::Up => {
                self.active = match self.active {
                    Some(i) if i > 0 => Some(i - 1),
                    _ => Some(last),
                };
                None
            }
            PaletteKey::Accept => {
                let selected = self.active_command()?;
                self.visible = false;
                Some(selected)
            }
            PaletteKey::Escape => {
                self.dismiss();
                None
            }
        }
    }

    pub fn select(&mut self, index: usize) -> Option<&'static CommandSuggestion> {
        let selected = COMMANDS.get(index)?;
        self.active = Some(index);
        self.visible = false;
        Some(selected)
    }
}
