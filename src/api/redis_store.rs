// Redis-backed `SortedSetStore`: `ZRANGE key 0 -1` over a fresh connection per read.
use std::time::Duration;

use redis::Commands;

use super::keyvalue::SortedSetStore;
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug)]
pub struct RedisStore {
    client: redis::Client,
    connect_timeout: Option<Duration>,
}

impl RedisStore {
    pub fn open(redis_url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(redis_url).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid redis url")
                .with_source(err)
        })?;
        Ok(Self {
            client,
            connect_timeout: None,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    fn connection(&self) -> Result<redis::Connection, Error> {
        let conn = match self.connect_timeout {
            Some(timeout) => self.client.get_connection_with_timeout(timeout),
            None => self.client.get_connection(),
        };
        conn.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to connect to redis")
                .with_source(err)
        })
    }
}

impl SortedSetStore for RedisStore {
    fn range_all(&self, key: &str) -> Result<Vec<String>, Error> {
        let mut conn = self.connection()?;
        conn.zrange::<_, Vec<String>>(key, 0, -1).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("redis zrange failed")
                .with_source(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::RedisStore;
    use crate::api::keyvalue::SortedSetStore;
    use crate::core::error::ErrorKind;

    #[test]
    fn bad_url_is_usage_error() {
        let err = RedisStore::open("not a redis url").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.message(), Some("invalid redis url"));
    }

    #[test]
    fn open_does_not_connect() {
        RedisStore::open("redis://127.0.0.1:1/0").expect("open");
    }

    #[test]
    fn unreachable_server_is_io_error() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr")
        };
        let store = RedisStore::open(&format!("redis://{addr}/0"))
            .expect("open")
            .with_connect_timeout(Duration::from_secs(2));
        let err = store.range_all("c:example.com/").expect_err("refused");
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
