pub const DEFAULT_LEFT_DELIMITER: &str = "{{";
pub const DEFAULT_RIGHT_DELIMITER: &str = "}}";
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Delimiters {
    /// Empty strings fall back to the defaults.
    pub fn new(left: &str, right: &str) -> Self {
        let pick = |s: &str, default: &str| {
            if s.is_empty() {
                default.to_string()
            } else {
                s.to_string()
            }
        };
        Self {
            left: pick(left, DEFAULT_LEFT_DELIMITER),
            right: pick(right, DEFAULT_RIGHT_DELIMITER),
        }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER)
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub delimiters: Delimiters,
    pub max_depth: usize, // 块嵌套的最大深度
    pub cache: bool,      // 是否缓存具名模板
}

impl EngineOptions {
    pub fn new() -> Self {
        EngineOptions {
            delimiters: Delimiters::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            cache: true,
        }
    }

    pub fn delimiters(mut self, left: &str, right: &str) -> Self {
        self.delimiters = Delimiters::new(left, right);
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}
