use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Run(#[from] provlog_run::RunError),

    #[error(transparent)]
    Store(#[from] provlog_store::Error),

    #[error(transparent)]
    Patch(#[from] provlog_patch::PatchError),

    #[error(transparent)]
    Import(#[from] provlog_import::ImportError),
}

pub type Result<T> = std::result::Result<T, Error>;
