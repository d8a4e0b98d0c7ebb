//! Latest-value command snapshot

use std::sync::Arc;

use parking_lot::RwLock;

use super::{CommandSource, DriveCommand};

/// Snapshot cell holding the current drive command
///
/// One writer (the transport layer) replaces the whole value; one reader
/// (the control loop) copies it out. No history is kept: a command that
/// arrives between two control cycles simply wins. Clones share the same
/// cell, so each side keeps its own handle.
#[derive(Debug, Clone, Default)]
pub struct CommandCell {
    current: Arc<RwLock<DriveCommand>>,
}

impl CommandCell {
    /// Cell holding the default stop command
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell seeded with `initial`
    pub fn with_initial(initial: DriveCommand) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
        }
    }

    /// Replace the stored command
    pub fn store(&self, command: DriveCommand) {
        *self.current.write() = command;
    }

    /// Copy the stored command
    pub fn load(&self) -> DriveCommand {
        *self.current.read()
    }
}

impl CommandSource for CommandCell {
    fn latest(&self) -> DriveCommand {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Direction;

    #[test]
    fn test_starts_with_stop() {
        let cell = CommandCell::new();
        assert_eq!(cell.load(), DriveCommand::default());
    }

    #[test]
    fn test_latest_value_wins() {
        let cell = CommandCell::new();
        cell.store(DriveCommand::new(Direction::Forward, 200, 50));
        cell.store(DriveCommand::new(Direction::Backward, 80, 20));

        let cmd = cell.latest();
        assert_eq!(cmd.direction, Direction::Backward);
        assert_eq!(cmd.speed, 80);
        assert_eq!(cmd.steer, 20);
    }

    #[test]
    fn test_clones_share_the_cell() {
        let writer = CommandCell::new();
        let reader = writer.clone();

        writer.store(DriveCommand::new(Direction::Right, 120, 75));
        assert_eq!(reader.latest().direction, Direction::Right);
    }

    #[test]
    fn test_seeded_cell() {
        let cell = CommandCell::with_initial(DriveCommand::new(Direction::Forward, 90, 50));
        assert_eq!(cell.load().speed, 90);
    }
}
