//! Purpose: Merge/resolve data carriers handed to resolve handlers during interactive commands.
//! Exports: `MergeForce`, `MergeStatus`, `MergeData`, `ResolveData`.
//! Invariants: `MergeData` is engine-owned state; handlers borrow it for the
//! duration of one resolve callback and answer with a `MergeStatus`.

/// Forcing policy for automatic resolves.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MergeForce {
    /// Accept the automatic recommendation, merged results included.
    #[default]
    Auto,
    /// Accept only when a single side changed; never take a merged result.
    Safe,
    /// Take the client's file regardless of chunks.
    Yours,
    /// Take the incoming file regardless of chunks.
    Theirs,
}

impl MergeForce {
    pub fn code(self) -> i32 {
        match self {
            MergeForce::Auto => 0,
            MergeForce::Safe => 1,
            MergeForce::Yours => 2,
            MergeForce::Theirs => 3,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => MergeForce::Safe,
            2 => MergeForce::Yours,
            3 => MergeForce::Theirs,
            _ => MergeForce::Auto,
        }
    }
}

/// Outcome of a resolve decision, reported back to the engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MergeStatus {
    Quit,
    Skip,
    Merged,
    Edit,
    Yours,
    Theirs,
}

impl MergeStatus {
    pub fn code(self) -> i32 {
        match self {
            MergeStatus::Quit => 0,
            MergeStatus::Skip => 1,
            MergeStatus::Merged => 2,
            MergeStatus::Edit => 3,
            MergeStatus::Yours => 4,
            MergeStatus::Theirs => 5,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => MergeStatus::Skip,
            2 => MergeStatus::Merged,
            3 => MergeStatus::Edit,
            4 => MergeStatus::Yours,
            5 => MergeStatus::Theirs,
            _ => MergeStatus::Quit,
        }
    }
}

/// Content-merge state for one file: the classic base/yours/theirs triple plus
/// the chunk counts the engine computed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MergeData {
    pub base_file: String,
    pub your_file: String,
    pub their_file: String,
    pub result_file: String,
    pub your_chunks: u32,
    pub their_chunks: u32,
    pub both_chunks: u32,
    pub conflict_chunks: u32,
    pub merge_digest: Option<String>,
    pub your_digest: Option<String>,
    pub their_digest: Option<String>,
}

impl MergeData {
    /// The automatic-resolve decision table. Conflicts make auto mode skip;
    /// `Safe` additionally refuses merged results where both sides changed.
    pub fn auto_resolve(&self, force: MergeForce) -> MergeStatus {
        match force {
            MergeForce::Yours => MergeStatus::Yours,
            MergeForce::Theirs => MergeStatus::Theirs,
            MergeForce::Auto | MergeForce::Safe => {
                if self.conflict_chunks > 0 {
                    return MergeStatus::Skip;
                }
                let yours = self.your_chunks + self.both_chunks;
                let theirs = self.their_chunks + self.both_chunks;
                if theirs == 0 {
                    MergeStatus::Yours
                } else if yours == 0 {
                    MergeStatus::Theirs
                } else if force == MergeForce::Safe {
                    MergeStatus::Skip
                } else {
                    MergeStatus::Merged
                }
            }
        }
    }
}

/// Action-level resolve state (branch/delete/filetype resolves and the like),
/// where the choice is between named actions rather than file contents.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolveData {
    pub resolve_type: String,
    pub merge_action: String,
    pub yours_action: String,
    pub their_action: String,
    pub prompt: String,
}
