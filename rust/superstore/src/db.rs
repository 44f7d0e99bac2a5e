//! Pooled, read-only access to the sales dataset store.

use crate::{
    config::AppConfig,
    error::{Result as ServiceResult, ServiceError},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bb8::{ManageConnection, Pool, PooledConnection};
use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use rustls_pemfile::certs;
use std::fs::File;
use std::io::BufReader;
use tokio_postgres::{Config as PgConfig, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{error, info};

pub type PgPool = Pool<PgConnectionManager>;
pub type PgPooledConnection<'a> = PooledConnection<'a, PgConnectionManager>;

const READ_ONLY_SESSION: &str = "SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY";

pub async fn connect_pool(config: &AppConfig) -> Result<PgPool> {
    let manager = PgConnectionManager::from_config(config)?;
    let pool = Pool::builder()
        .max_size(config.max_pool_size)
        .connection_timeout(config.pool_timeout)
        .build(manager)
        .await
        .context("failed to build PostgreSQL connection pool")?;

    // One-time connectivity check; the service still starts when the store is down.
    match pool.get().await {
        Ok(_) => info!("dataset store connectivity check succeeded"),
        Err(err) => error!(error = ?err, "initial dataset store connectivity check failed"),
    }

    Ok(pool)
}

/// Builds the pool without opening any connection until the first checkout.
pub fn lazy_pool(config: &AppConfig) -> Result<PgPool> {
    let manager = PgConnectionManager::from_config(config)?;
    Ok(Pool::builder()
        .max_size(config.max_pool_size)
        .connection_timeout(config.pool_timeout)
        .build_unchecked(manager))
}

pub async fn checkout(pool: &PgPool) -> ServiceResult<PgPooledConnection<'_>> {
    pool.get().await.map_err(|err| {
        error!(error = ?err, "failed to acquire database connection");
        ServiceError::DatastoreUnavailable(format!("{err:?}"))
    })
}

#[derive(Clone)]
pub struct PgConnectionManager {
    config: PgConfig,
    tls: PgTls,
}

#[derive(Clone)]
enum PgTls {
    None,
    Rustls(MakeRustlsConnect),
}

impl PgConnectionManager {
    fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.database_url,
            config.pg_ssl_root_cert.as_deref(),
            config.pg_ssl_cert.as_deref(),
            config.pg_ssl_key.as_deref(),
        )
    }

    fn new(
        database_url: &str,
        root_cert: Option<&str>,
        client_cert: Option<&str>,
        client_key: Option<&str>,
    ) -> Result<Self> {
        let config = database_url
            .parse::<PgConfig>()
            .context("invalid DATABASE_URL")?;
        let tls = match root_cert {
            Some(path) => PgTls::Rustls(build_tls_connector(path, client_cert, client_key)?),
            None => PgTls::None,
        };
        Ok(Self { config, tls })
    }
}

#[async_trait]
impl ManageConnection for PgConnectionManager {
    type Connection = AsyncPgConnection;
    type Error = anyhow::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let mut conn = match &self.tls {
            PgTls::None => {
                let (client, connection) = self.config.connect(NoTls).await?;
                AsyncPgConnection::try_from_client_and_connection(client, connection).await
            }
            PgTls::Rustls(connector) => {
                let (client, connection) = self.config.connect(connector.clone()).await?;
                AsyncPgConnection::try_from_client_and_connection(client, connection).await
            }
        }
        .context("failed to open dataset store session")?;

        // The API never writes; pin every pooled session read-only.
        conn.batch_execute(READ_ONLY_SESSION)
            .await
            .context("failed to mark dataset store session read-only")?;
        Ok(conn)
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.batch_execute("SELECT 1").await?;
        Ok(())
    }

    fn has_broken(&self, _: &mut Self::Connection) -> bool {
        false
    }
}

fn build_tls_connector(
    root_cert: &str,
    client_cert: Option<&str>,
    client_key: Option<&str>,
) -> Result<MakeRustlsConnect> {
    let mut reader = BufReader::new(File::open(root_cert).context("failed to open PGSSLROOTCERT")?);
    let mut root_store = RootCertStore::empty();
    for cert in certs(&mut reader) {
        let cert = cert.context("failed to parse PGSSLROOTCERT")?;
        root_store
            .add(cert)
            .map_err(|_| anyhow::anyhow!("invalid certificate in PGSSLROOTCERT"))?;
    }

    let builder = ClientConfig::builder().with_root_certificates(root_store);
    let tls = match (client_cert, client_key) {
        (None, None) => builder.with_no_client_auth(),
        (Some(cert), Some(key)) => builder
            .with_client_auth_cert(load_client_certs(cert)?, load_client_key(key)?)
            .with_context(|| format!("failed to build client TLS config for {root_cert}"))?,
        _ => anyhow::bail!("PGSSLCERT and PGSSLKEY must both be set (or neither)"),
    };

    Ok(MakeRustlsConnect::new(tls))
}

fn load_client_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open PGSSLCERT file '{path}'"))?,
    );

    let chain = certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to parse PGSSLCERT")?;
    if chain.is_empty() {
        anyhow::bail!("PGSSLCERT contained no certificates");
    }

    Ok(chain)
}

fn load_client_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open PGSSLKEY file '{path}'"))?,
    );

    rustls_pemfile::private_key(&mut reader)
        .context("failed to parse PGSSLKEY")?
        .context("PGSSLKEY contained no private keys")
}
