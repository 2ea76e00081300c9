/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai";
pub const DEFAULT_GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 600; // 10 minutes for large model requests
pub const SSE_KEEP_ALIVE_SECS: u64 = 15;

// Default Model Configuration
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: usize = 4096;
pub const DEFAULT_TOP_P: f32 = 1.0;

// Session lifetimes
pub const DEFAULT_SESSION_TTL_SECS: u64 = 300;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

// Context sizing (approximate tokens, 4 UTF-16 units per token)
pub const CHARS_PER_TOKEN: usize = 4;
pub const CONTEXT_WARNING_THRESHOLD: usize = 3000;
pub const CONTEXT_MAX_TOKENS: usize = 4000;
pub const SUMMARY_TAIL_MESSAGES: usize = 2;

// Summarization sampling
pub const SUMMARY_TEMPERATURE: f32 = 0.3;
pub const SUMMARY_MAX_TOKENS: usize = 500;

// Consensus fan-out
pub const CONSENSUS_PHASE_WIDTH: usize = 3;

// UI-only message roles that never reach the provider
pub const SEPARATOR_ROLE: &str = "separator";
pub const DEEPMIND_PROGRESS_ROLE: &str = "deepmind-progress";

// The math renderer on the client depends on this exact wording.
pub const LATEX_SYSTEM_DIRECTIVE: &str = "You are a helpful assistant. When your answer contains \
mathematical content, always format it with LaTeX: use $...$ for inline math and $$...$$ for \
display equations. Never write formulas as plain text or inside code blocks.";

pub const LATEX_SYSTEM_DIRECTIVE_SHORT: &str =
    "Format all mathematical content with LaTeX, using $...$ for inline math and $$...$$ for display equations.";

pub const SUMMARY_PREFIX: &str = "Previous conversation summary: ";
