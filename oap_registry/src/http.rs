use std::io::Read;
use std::time::{Duration, Instant};

use log::info;
use url::Url;

use crate::Result;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves the text of asset definitions referenced by url.
pub trait DefinitionFetcher {
    fn fetch(&self, url: &Url) -> Result<String>;
}

pub struct HttpFetcher {
    agent: ureq::Agent,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(proxy: Option<&str>, timeout: Duration) -> Result<Self> {
        let agent = match proxy {
            Some(proxy) if !proxy.is_empty() => {
                let proxy = ureq::Proxy::new(proxy)?;
                ureq::AgentBuilder::new().proxy(proxy).build()
            }
            _ => ureq::agent(),
        };
        Ok(HttpFetcher {
            agent,
            timeout,
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        HttpFetcher {
            agent: ureq::agent(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DefinitionFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String> {
        let start = Instant::now();

        let response = self.agent.get(url.as_str()).timeout(self.timeout).call()?;
        let status = response.status();

        info!("call to {} returned w/ status {} in {:?}", url, status, start.elapsed());

        let mut body = String::new();
        response.into_reader().read_to_string(&mut body)?;

        info!("END call {} {} took: {:?}", url, status, start.elapsed());

        Ok(body)
    }
}
