use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed lease registry entry: {0}")]
    Registry(String),

    #[error(
        "Profile '{profile}' is busy: held by pid {owner_pid} on port {port} for {held_secs}s"
    )]
    ProfileBusy {
        profile: String,
        port: u16,
        owner_pid: u32,
        held_secs: u64,
    },

    #[error("No free debugging port in range {range_start}-{range_end}")]
    PortExhausted { range_start: u16, range_end: u16 },

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
