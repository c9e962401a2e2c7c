//! FTPS (explicit TLS) [`FileTransfer`] onto the platform's staging host.
//!
//! `suppaftp` is blocking, so each transfer runs on the blocking thread pool.

use std::fs::File;

use async_trait::async_trait;
use sli_load_core::contract::{FileTransfer, TransferRequest};
use sli_load_core::{Result, SliError, UploadStage};
use suppaftp::native_tls::TlsConnector;
use suppaftp::types::FileType;
use suppaftp::{FtpError, Mode, NativeTlsConnector, NativeTlsFtpStream};
use tracing::{error, info, warn};

pub const DEFAULT_FTP_PORT: u16 = 21;

#[derive(Debug, Clone, Copy)]
pub struct FtpsTransfer {
    port: u16,
}

impl Default for FtpsTransfer {
    fn default() -> Self {
        Self {
            port: DEFAULT_FTP_PORT,
        }
    }
}

impl FtpsTransfer {
    pub fn with_port(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait]
impl FileTransfer for FtpsTransfer {
    async fn transfer(&self, request: TransferRequest) -> Result<()> {
        let port = self.port;
        tokio::task::spawn_blocking(move || put_archive(&request, port))
            .await
            .map_err(|e| {
                error!(error = %e, "FTPS transfer task failed");
                SliError::upload(UploadStage::Transfer, format!("transfer task failed: {e}"))
            })?
    }
}

fn failed(stage: UploadStage) -> impl Fn(FtpError) -> SliError {
    move |e| {
        error!(stage = %stage, error = %e, "FTPS step failed");
        SliError::upload(stage, e.to_string())
    }
}

fn put_archive(request: &TransferRequest, port: u16) -> Result<()> {
    let address = format!("{}:{port}", request.host);
    info!(address = %address, remote_directory = %request.remote_directory, "Connecting to staging host");

    let connector = TlsConnector::new().map_err(|e| {
        error!(error = %e, "Cannot initialise TLS");
        SliError::upload(UploadStage::Connect, e.to_string())
    })?;
    let mut ftp = NativeTlsFtpStream::connect(&address)
        .map_err(failed(UploadStage::Connect))?
        .into_secure(NativeTlsConnector::from(connector), &request.host)
        .map_err(failed(UploadStage::Connect))?;

    ftp.login(&request.credentials.username, &request.credentials.secret)
        .map_err(failed(UploadStage::Login))?;
    ftp.set_mode(Mode::Passive);
    ftp.mkdir(&request.remote_directory)
        .map_err(failed(UploadStage::CreateDirectory))?;
    ftp.cwd(&request.remote_directory)
        .map_err(failed(UploadStage::ChangeDirectory))?;
    ftp.transfer_type(FileType::Binary)
        .map_err(failed(UploadStage::Transfer))?;

    let mut file = File::open(&request.local_path).map_err(|e| {
        error!(path = %request.local_path.display(), error = %e, "Cannot open load archive");
        SliError::upload(
            UploadStage::Transfer,
            format!("cannot open {}: {e}", request.local_path.display()),
        )
    })?;
    let bytes = ftp
        .put_file(&request.remote_name, &mut file)
        .map_err(failed(UploadStage::Transfer))?;

    if let Err(e) = ftp.quit() {
        warn!(error = %e, "FTPS quit failed after successful transfer");
    }
    info!(
        remote_directory = %request.remote_directory,
        remote_name = %request.remote_name,
        bytes,
        "Archive stored on staging host"
    );
    Ok(())
}
