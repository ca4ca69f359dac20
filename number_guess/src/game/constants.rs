/// Number of players a table waits for when none is configured.
pub const DEFAULT_REQUIRED_PLAYERS: usize = 2;

/// Upper bound on the configurable table size.
pub const MAX_REQUIRED_PLAYERS: usize = 64;

/// Display names are truncated to this many characters.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Hex digits of a v4 UUID used in generated player ids.
pub const PLAYER_ID_HEX_LENGTH: usize = 6;

/// The only numbers a player may raise.
pub const RAISE_CHOICES: [i64; 2] = [1, 2];

/// Stand-in for a guess that has not been revealed yet.
pub const HIDDEN_GUESS_MARKER: &str = "?";
