#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub block_size: usize,
    pub allow_ai_augment: bool,
    pub ai_augment_count: usize,
    pub allow_ai_explain: bool,
    pub shuffle_enabled: bool,
    pub shuffle_question_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            block_size: 10,
            allow_ai_augment: false,
            ai_augment_count: 10,
            allow_ai_explain: false,
            shuffle_enabled: true,
            shuffle_question_enabled: false,
        }
    }
}

// Partial settings supplied by the embedder; re-applied over the defaults on
// every reset.
#[derive(Clone, Debug, Default)]
pub struct SettingsOverrides {
    pub block_size: Option<usize>,
    pub allow_ai_augment: Option<bool>,
    pub ai_augment_count: Option<usize>,
    pub allow_ai_explain: Option<bool>,
    pub shuffle_enabled: Option<bool>,
    pub shuffle_question_enabled: Option<bool>,
}

impl Settings {
    pub fn with_overrides(overrides: &SettingsOverrides) -> Settings {
        let defaults = Settings::default();
        Settings {
            block_size: overrides.block_size.unwrap_or(defaults.block_size),
            allow_ai_augment: overrides
                .allow_ai_augment
                .unwrap_or(defaults.allow_ai_augment),
            ai_augment_count: overrides
                .ai_augment_count
                .unwrap_or(defaults.ai_augment_count),
            allow_ai_explain: overrides
                .allow_ai_explain
                .unwrap_or(defaults.allow_ai_explain),
            shuffle_enabled: overrides.shuffle_enabled.unwrap_or(defaults.shuffle_enabled),
            shuffle_question_enabled: overrides
                .shuffle_question_enabled
                .unwrap_or(defaults.shuffle_question_enabled),
        }
    }
}
