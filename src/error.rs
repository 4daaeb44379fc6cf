use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("search for {name:?} failed on {failed} of {attempted} variants: {last_error}")]
    Remote {
        name: String,
        attempted: usize,
        failed: usize,
        last_error: String,
    },
    #[error("squad fetch for team {team_id} failed: {message}")]
    Squad { team_id: u64, message: String },
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("result lookup for match {match_id} failed: {message}")]
    Lookup { match_id: String, message: String },
    #[error("persisting prediction {id} failed: {message}")]
    Persist { id: i64, message: String },
}
