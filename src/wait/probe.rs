// ABOUTME: Single readiness probes: container state, TCP connect, and HTTP GET.
// ABOUTME: Failures carry their cause via snafu context selectors; the waiter only logs them.

use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use snafu::{ResultExt, Snafu, ensure};
use tokio::net::TcpStream;

use crate::session::ContainerOps;
use crate::types::ContainerId;

/// Why one probe attempt did not see a ready service.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProbeError {
    #[snafu(display("failed to query state of {id}: {source}"))]
    State {
        id: ContainerId,
        source: crate::error::Error,
    },

    #[snafu(display("container {id} is not running"))]
    NotRunning { id: ContainerId },

    #[snafu(display("connect to {address} failed: {source}"))]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[snafu(display("invalid request for {path}: {message}"))]
    Request { path: String, message: String },

    #[snafu(display("HTTP exchange with {address} failed: {source}"))]
    Http {
        address: String,
        source: hyper::Error,
    },

    #[snafu(display("{address}{path} answered {actual}, expected {expected}"))]
    Status {
        address: String,
        path: String,
        expected: u16,
        actual: u16,
    },
}

pub(crate) async fn running<R>(ops: &R, id: &ContainerId) -> Result<(), ProbeError>
where
    R: ContainerOps + ?Sized,
{
    let running = ops
        .container_running(id)
        .await
        .context(StateSnafu { id: id.clone() })?;
    ensure!(running, NotRunningSnafu { id: id.clone() });
    Ok(())
}

pub(crate) async fn port(host: &str, port: u16) -> Result<(), ProbeError> {
    connect(host, port).await.map(drop)
}

pub(crate) async fn http(
    host: &str,
    port: u16,
    path: &str,
    expected_status: u16,
) -> Result<(), ProbeError> {
    let address = format!("{host}:{port}");
    let stream = connect(host, port).await?;
    let io = TokioIo::new(stream);

    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .context(HttpSnafu {
            address: address.clone(),
        })?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("probe connection error: {}", e);
        }
    });

    let req = hyper::Request::builder()
        .method("GET")
        .uri(path)
        .header("Host", address.as_str())
        .body(Empty::<bytes::Bytes>::new())
        .map_err(|e| {
            RequestSnafu {
                path,
                message: e.to_string(),
            }
            .build()
        })?;

    let resp = sender.send_request(req).await.context(HttpSnafu {
        address: address.clone(),
    })?;

    let actual = resp.status().as_u16();
    ensure!(
        actual == expected_status,
        StatusSnafu {
            address,
            path,
            expected: expected_status,
            actual,
        }
    );
    Ok(())
}

async fn connect(host: &str, port: u16) -> Result<TcpStream, ProbeError> {
    TcpStream::connect((host, port))
        .await
        .context(ConnectSnafu {
            address: format!("{host}:{port}"),
        })
}
