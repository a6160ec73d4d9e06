//! Environment, sub-database and write flags.

use bitflags::bitflags;

bitflags! {
    /// Flags applied to the whole environment at open time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EnvFlags: u32 {
        /// Never sync the commit log; a crash may lose recent commits.
        const NO_SYNC = 0x10000;
        /// Reject every write transaction.
        const READ_ONLY = 0x20000;
    }
}

bitflags! {
    /// Flags for sub-database resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DbFlags: u32 {
        /// Register the name if it does not exist yet.
        const CREATE = 0x40000;
    }
}

bitflags! {
    /// Flags for a single put.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PutFlags: u32 {
        /// Fail with `KeyExists` instead of replacing an existing value.
        const NO_OVERWRITE = 0x10;
    }
}
