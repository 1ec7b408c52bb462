use super::data::{DataOpener, PendingTransfer};
use super::port::PendingConnection;
use super::{
    ConnectionPool, ControlConnection, DataConnection, DataConnectionMode, SharedConnection,
    TcpDataConnectionInitiator,
};
use crate::constants::DATA_CONNECTION_TIMEOUT_SECS;
use crate::core_ftpcommand::Reply;
use crate::server::ServerContext;
use crate::session::{AttributeValue, SessionKey, TransferOutcome};
use anyhow::{bail, Context, Result};
use log::{debug, error, info, trace, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;

/// Accepts control connections until the listener fails.
pub async fn start_server(
    listener: TcpListener,
    context: Arc<ServerContext>,
    control_pool: Arc<ConnectionPool<ControlConnection>>,
    data_pool: Arc<ConnectionPool<DataConnection>>,
) -> Result<()> {
    loop {
        let (socket, addr) = listener.accept().await?;
        if context.core.is_poisoned() {
            debug!("Refused connection from {}, server is shutting down", addr);
            continue;
        }
        info!("New connection from {}", addr);

        let (connection, replies) = ControlConnection::new(
            context.next_connection_id(),
            Some(addr),
            Arc::clone(&context),
            Box::new(TcpDataConnectionInitiator::new()),
        );
        let connection = SharedConnection::new(connection);
        if let Err(e) = control_pool.add(connection.clone()) {
            warn!("Dropping connection from {}: {}", addr, e);
            continue;
        }

        let context = Arc::clone(&context);
        let data_pool = Arc::clone(&data_pool);
        tokio::spawn(async move {
            if let Err(e) =
                handle_connection(socket, connection.clone(), replies, context, data_pool).await
            {
                error!("Connection error from {}: {:?}", addr, e);
            }
            connection.lock().await.close();
            info!("Connection closed for {}", addr);
        });
    }
}

/// Drives one control socket: lines go to `dispatch`, queued replies go out.
pub async fn handle_connection(
    socket: TcpStream,
    connection: SharedConnection<ControlConnection>,
    mut replies: UnboundedReceiver<Reply>,
    context: Arc<ServerContext>,
    data_pool: Arc<ConnectionPool<DataConnection>>,
) -> Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();

    connection
        .lock()
        .await
        .reply(Reply::system("220", context.config.server.banner.as_str()));

    loop {
        tokio::select! {
            reply = replies.recv() => match reply {
                Some(reply) => {
                    writer.write_all(reply.to_wire().as_bytes()).await?;
                }
                // Every sender is gone: the connection was destroyed
                None => break,
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    trace!("Received command: {}", line);
                    let started = {
                        let mut conn = connection.lock().await;
                        conn.dispatch(&line);
                        conn.take_pending_transfer().map(|transfer| {
                            let active = conn.data_connection_initiator_mut().take_connection();
                            (transfer, active, conn.peer())
                        })
                    };
                    if let Some((transfer, active, peer)) = started {
                        start_transfer(&connection, &context, &data_pool, transfer, active, peer)
                            .await;
                    }
                }
                None => {
                    debug!("Client disconnected");
                    break;
                }
            }
        }
    }

    writer.shutdown().await.ok();
    Ok(())
}

async fn start_transfer(
    connection: &SharedConnection<ControlConnection>,
    context: &Arc<ServerContext>,
    data_pool: &ConnectionPool<DataConnection>,
    transfer: PendingTransfer,
    active: Option<PendingConnection>,
    peer: Option<SocketAddr>,
) {
    let mode = transfer.mode;
    let control = connection.clone();
    let task_context = Arc::clone(context);

    let task = tokio::spawn(async move {
        let outcome = match run_transfer(&task_context, transfer, active, peer).await {
            Ok(bytes) => TransferOutcome::Completed { mode, bytes },
            Err(e) => TransferOutcome::Failed {
                mode,
                reason: format!("{:#}", e),
            },
        };
        control
            .lock()
            .await
            .session_mut()
            .set_attribute(SessionKey::TransferOutcome, AttributeValue::Outcome(outcome));
    });

    connection.lock().await.set_transfer_handle(task.abort_handle());
    let data = DataConnection::new(context.next_connection_id(), mode, task);
    if let Err(e) = data_pool.add(SharedConnection::new(data)) {
        warn!("Transfer not pooled: {}", e);
    }
}

async fn run_transfer(
    context: &ServerContext,
    transfer: PendingTransfer,
    active: Option<PendingConnection>,
    peer: Option<SocketAddr>,
) -> Result<u64> {
    let mut stream = match transfer.opener {
        DataOpener::Passive { port } => accept_passive(context, port, peer).await?,
        DataOpener::Active => active
            .context("No active data connection was started")?
            .await
            .context("Active data connection task failed")?
            .context("Failed to connect to the client")?,
    };

    let bytes = match transfer.mode {
        DataConnectionMode::Retr => {
            let mut file = File::open(&transfer.path)
                .await
                .with_context(|| format!("Failed to open {}", transfer.path))?;
            tokio::io::copy(&mut file, &mut stream).await?
        }
        DataConnectionMode::Stor | DataConnectionMode::Stou => {
            let mut options = OpenOptions::new();
            options.write(true);
            if transfer.append {
                options.create(true).append(true);
            } else if transfer.mode == DataConnectionMode::Stou {
                options.create_new(true);
            } else {
                options.create(true).truncate(true);
            }
            let mut file = options
                .open(&transfer.path)
                .await
                .with_context(|| format!("Failed to open {}", transfer.path))?;
            let bytes = tokio::io::copy(&mut stream, &mut file).await?;
            file.flush().await?;
            bytes
        }
        DataConnectionMode::List => {
            let listing = transfer.listing.unwrap_or_default();
            stream.write_all(listing.as_bytes()).await?;
            listing.len() as u64
        }
    };

    stream.shutdown().await.ok();
    Ok(bytes)
}

/// Waits for the client on a bound data port. Connections from another host are refused.
async fn accept_passive(
    context: &ServerContext,
    port: u16,
    peer: Option<SocketAddr>,
) -> Result<TcpStream> {
    let Some(listener) = context.listeners.listener(port) else {
        bail!("Data port {} is not bound", port);
    };
    let listener = TcpListener::from_std(listener)?;
    let timeout = Duration::from_secs(DATA_CONNECTION_TIMEOUT_SECS);

    loop {
        let (stream, addr) = tokio::time::timeout(timeout, listener.accept())
            .await
            .context("Timed out waiting for the data connection")??;
        match peer {
            Some(peer) if peer.ip().to_canonical() != addr.ip().to_canonical() => {
                warn!("Refused data connection from {} (control peer {})", addr, peer);
            }
            _ => {
                debug!("Accepted data connection from: {}", addr);
                return Ok(stream);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_network::port::DataConnectionInitiator;
    use crate::core_server::CoreStatus;
    use crate::test_support::{test_server, BOB_PASSWORD};
    use tokio::io::AsyncReadExt;

    type ReplyLines = tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>;

    async fn read_reply(lines: &mut ReplyLines) -> String {
        loop {
            let line = lines.next_line().await.unwrap().unwrap();
            // Skip the lines of a multi-line reply
            if line.len() >= 4 && line.as_bytes()[3] == b' ' {
                return line;
            }
        }
    }

    #[tokio::test]
    async fn test_passive_retrieve_end_to_end() {
        let server = test_server();
        std::fs::write(server.path("bob/hello.txt"), b"hello world").unwrap();
        let context = Arc::clone(&server.context);
        let core = Arc::new(CoreStatus::new());
        let control_pool = Arc::new(ConnectionPool::new("control", Arc::clone(&core)));
        let data_pool = Arc::new(ConnectionPool::new("data", core));
        let control_service = control_pool.spawn_service(Duration::from_millis(10));
        let data_service = data_pool.spawn_service(Duration::from_millis(10));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let host = tokio::spawn(start_server(
            listener,
            context,
            Arc::clone(&control_pool),
            Arc::clone(&data_pool),
        ));

        let client = TcpStream::connect(address).await.unwrap();
        let (reader, mut writer) = client.into_split();
        let mut lines = BufReader::new(reader).lines();
        assert!(read_reply(&mut lines).await.starts_with("220"));

        let pass = format!("PASS {}", BOB_PASSWORD);
        for (command, code) in [("USER bob", "331"), (pass.as_str(), "230")] {
            writer.write_all(format!("{}\r\n", command).as_bytes()).await.unwrap();
            assert!(read_reply(&mut lines).await.starts_with(code));
        }

        writer.write_all(b"PASV\r\n").await.unwrap();
        let pasv = read_reply(&mut lines).await;
        assert!(pasv.starts_with("227"));
        let numbers: Vec<u16> = pasv[pasv.find('(').unwrap() + 1..pasv.find(')').unwrap()]
            .split(',')
            .map(|n| n.parse().unwrap())
            .collect();
        let data_port = numbers[4] * 256 + numbers[5];

        writer.write_all(b"RETR hello.txt\r\n").await.unwrap();
        assert!(read_reply(&mut lines).await.starts_with("150"));

        let mut data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
        let mut received = String::new();
        data.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "hello world");

        assert!(read_reply(&mut lines).await.starts_with("226"));

        writer.write_all(b"QUIT\r\n").await.unwrap();
        assert!(read_reply(&mut lines).await.starts_with("221"));

        host.abort();
        control_pool.destroy().await;
        data_pool.destroy().await;
        let _ = tokio::join!(control_service, data_service);
    }

    #[tokio::test]
    async fn test_active_connection_is_handed_to_the_transfer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut initiator = TcpDataConnectionInitiator::new();
        initiator.set_target(listener.local_addr().unwrap());
        initiator.activate();

        let server = test_server();
        let transfer = PendingTransfer::listing(DataOpener::Active, "a\r\nb\r\n".to_string());
        let (sent, accepted) = tokio::join!(
            run_transfer(&server.context, transfer, initiator.take_connection(), None),
            listener.accept()
        );
        assert_eq!(sent.unwrap(), 6);

        let (mut stream, _) = accepted.unwrap();
        let mut received = String::new();
        stream.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "a\r\nb\r\n");
    }

    #[tokio::test]
    async fn test_active_transfer_without_connection_fails() {
        let server = test_server();
        let transfer = PendingTransfer::listing(DataOpener::Active, String::new());
        assert!(run_transfer(&server.context, transfer, None, None).await.is_err());
    }
}
