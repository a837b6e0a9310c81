/// Constants used throughout the deployenv codebase
// Layer names
pub const DEFAULT_LAYER: &str = "default";

// Secret references
pub const DEFAULT_REFERENCE_PREFIX: &str = "credstash";
pub const DEFAULT_BACKEND_PROGRAM: &str = "credstash";

// Environment variable names
pub const DEPLOYENV_STAGE_VAR: &str = "DEPLOYENV_STAGE";
pub const DEPLOYENV_LOG_VAR: &str = "DEPLOYENV_LOG";

// Descriptor defaults
pub const DEFAULT_DESCRIPTOR_FILE: &str = "serverless.yml";

// Subprocess output
pub const COMMAND_OUTPUT_PREFIX: &str = "[COMMAND OUTPUT]";
