//! TCP server for the registration protocol.
//!
//! Accepts connections and runs the connection handler on each one. By
//! default a connection is served to completion before the next accept;
//! with `concurrent` enabled every connection gets its own task.

use crate::catalog::Catalog;
use crate::config::Config;
use crate::connection::handle_connection;
use crate::dispatch::Dispatcher;
use crate::registration::RegistrationLog;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::{error, info, warn};

/// Server instance
pub struct Server {
    config: Config,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Create a server backed by the configured catalog and registration log
    pub fn new(config: Config) -> Self {
        let catalog = Arc::new(Catalog::new(&config.catalog));
        let log = Arc::new(RegistrationLog::new(&config.registrations));
        info!(
            catalog = %catalog.path().display(),
            registrations = %log.path().display(),
            "Initializing stores"
        );

        let dispatcher = Dispatcher::standard(catalog, log);
        Self::with_dispatcher(config, dispatcher)
    }

    /// Create a server with a custom verb table
    pub fn with_dispatcher(config: Config, dispatcher: Dispatcher) -> Self {
        Server {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Bind the configured listen address
    pub async fn bind(&self) -> io::Result<TcpListener> {
        let addr = lookup_host(&self.config.listen).await?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no address found for {}", self.config.listen),
            )
        })?;

        let listener = TcpListener::from_std(create_listener(addr, self.config.backlog)?)?;
        info!(address = %listener.local_addr()?, "Server listening");
        Ok(listener)
    }

    /// Bind and serve forever
    pub async fn run(&self) -> io::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await;
        Ok(())
    }

    /// Accept and serve connections on `listener` forever
    pub async fn serve(&self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!(peer = %peer, "Client connected");

                    let dispatcher = Arc::clone(&self.dispatcher);
                    let max_commands = self.config.max_commands;
                    let task = tokio::spawn(serve_client(stream, peer, dispatcher, max_commands));

                    if !self.config.concurrent {
                        if let Err(e) = task.await {
                            error!(peer = %peer, error = %e, "Connection task failed");
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    max_commands: usize,
) {
    match handle_connection(stream, &dispatcher, max_commands).await {
        Ok(served) => info!(peer = %peer, served, "Client disconnected"),
        Err(e) => warn!(peer = %peer, error = %e, "Connection error"),
    }
}

/// Create a TCP listener with the given backlog.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::dispatch::CommandHandler;
    use crate::error::Result;
    use crate::model::{Course, RegistrationForm};
    use crate::protocol::Response;
    use async_trait::async_trait;
    use std::path::Path;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    fn test_config(dir: &Path) -> Config {
        let catalog = dir.join("cours.txt");
        std::fs::write(
            &catalog,
            "Fall\tIFT1015\tProgramming1\n\
             Fall\tIFT9999\n\
             Winter\tIFT1025\tProgramming2\n",
        )
        .unwrap();

        Config {
            listen: "127.0.0.1:0".to_string(),
            catalog,
            registrations: dir.join("inscription.txt"),
            ..Config::default()
        }
    }

    /// Handler that takes its connection task down with it.
    struct Panics;

    #[async_trait]
    impl CommandHandler for Panics {
        async fn handle(&self, _argument: &str) -> Result<Response> {
            panic!("handler crashed");
        }
    }

    async fn start(config: Config) -> Client {
        start_server(Server::new(config)).await
    }

    async fn start_server(server: Server) -> Client {
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { server.serve(listener).await });
        Client::new(addr.to_string())
    }

    #[tokio::test]
    async fn test_load_courses() {
        let dir = tempfile::tempdir().unwrap();
        let client = start(test_config(dir.path())).await;

        let response = client.load_courses("Fall").await.unwrap();
        assert_eq!(
            response,
            Response::Courses(vec![Course::new("Fall", "IFT1015", "Programming1")])
        );

        let response = client.load_courses("Summer").await.unwrap();
        assert_eq!(response, Response::Courses(vec![]));
    }

    #[tokio::test]
    async fn test_register_twice_appends_twice() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let log_path = config.registrations.clone();
        let client = start(config).await;

        let form = RegistrationForm::new("123", "IFT1025");
        for _ in 0..2 {
            match client.register(&form).await.unwrap() {
                Response::Confirmation(msg) => assert!(msg.contains("IFT1025")),
                other => panic!("unexpected: {:?}", other),
            }
        }

        let records = RegistrationLog::new(log_path).read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.form == form));
    }

    #[tokio::test]
    async fn test_unknown_verb_then_close() {
        let dir = tempfile::tempdir().unwrap();
        let client = start(test_config(dir.path())).await;

        let mut stream = TcpStream::connect(client.addr()).await.unwrap();
        stream.write_all(b"F1 Fall\n").await.unwrap();

        let mut reader = BufReader::new(&mut stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(
            Response::decode(&line).unwrap(),
            Response::Error("unknown command: F1".to_string())
        );

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_survives_abandoned_connection() {
        let dir = tempfile::tempdir().unwrap();
        let client = start(test_config(dir.path())).await;

        drop(TcpStream::connect(client.addr()).await.unwrap());

        let mut half_sent = TcpStream::connect(client.addr()).await.unwrap();
        half_sent.write_all(b"CHARGER Fa").await.unwrap();
        drop(half_sent);

        let response = client.load_courses("Winter").await.unwrap();
        assert_eq!(
            response,
            Response::Courses(vec![Course::new("Winter", "IFT1025", "Programming2")])
        );
    }

    #[tokio::test]
    async fn test_survives_failed_connections() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut dispatcher = Dispatcher::standard(
            Arc::new(Catalog::new(&config.catalog)),
            Arc::new(RegistrationLog::new(&config.registrations)),
        );
        dispatcher.register("CRASH", Panics);
        let client = start_server(Server::with_dispatcher(config, dispatcher)).await;

        // The connection task panics; the socket closes without a reply.
        let mut crashed = TcpStream::connect(client.addr()).await.unwrap();
        crashed.write_all(b"CRASH now\n").await.unwrap();
        let mut rest = Vec::new();
        let _ = crashed.read_to_end(&mut rest).await;
        assert!(rest.is_empty());

        // The handler returns a transport error for an undecodable line.
        let mut garbled = TcpStream::connect(client.addr()).await.unwrap();
        garbled.write_all(b"CHARGER \xff\xfe\n").await.unwrap();
        let mut rest = Vec::new();
        let _ = garbled.read_to_end(&mut rest).await;
        assert!(rest.is_empty());

        let response = client.load_courses("Fall").await.unwrap();
        assert_eq!(
            response,
            Response::Courses(vec![Course::new("Fall", "IFT1015", "Programming1")])
        );
    }

    #[tokio::test]
    async fn test_catalog_edits_are_visible() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let catalog = config.catalog.clone();
        let client = start(config).await;

        assert_eq!(
            client.load_courses("Summer").await.unwrap(),
            Response::Courses(vec![])
        );

        std::fs::write(&catalog, "Summer\tIFT2256\tDatabases\n").unwrap();
        assert_eq!(
            client.load_courses("Summer").await.unwrap(),
            Response::Courses(vec![Course::new("Summer", "IFT2256", "Databases")])
        );
    }

    #[tokio::test]
    async fn test_concurrent_registrations() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            concurrent: true,
            backlog: 64,
            ..test_config(dir.path())
        };
        let log_path = config.registrations.clone();
        let client = start(config).await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                client
                    .register(&RegistrationForm::new(i.to_string(), "IFT1015"))
                    .await
            }));
        }
        for task in tasks {
            assert!(!task.await.unwrap().unwrap().is_error());
        }

        let records = RegistrationLog::new(log_path).read_all().await.unwrap();
        assert_eq!(records.len(), 8);
    }
}
