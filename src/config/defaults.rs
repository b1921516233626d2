//! Default value functions for configuration.

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

// =============================================================================
// Bot Defaults
// =============================================================================

pub fn default_stop_command() -> String {
    "!stop".to_string()
}

// =============================================================================
// Connection Defaults
// =============================================================================

pub fn default_poll_interval_ms() -> u64 {
    50
}

pub fn default_registration_delay_ms() -> u64 {
    100
}

pub fn default_registration_timeout_secs() -> u64 {
    60
}

pub fn default_read_buffer_size() -> usize {
    2048
}

pub fn default_quit_message() -> String {
    "Leaving".to_string()
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_filter() -> String {
    "info".to_string()
}
