#![allow(dead_code)]

pub mod app_root {
    use gantry::config::{AppConfig, ExecutionMode};
    use std::fs;
    use std::path::Path;

    /// A throwaway application root with the expected directory layout.
    ///
    /// Starts with just `src/server/handlers`; the builder methods add the
    /// pieces a test needs. The directory is removed on drop.
    pub struct TempAppRoot {
        dir: tempfile::TempDir,
    }

    impl TempAppRoot {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().expect("create temp app root");
            fs::create_dir_all(dir.path().join("src/server/handlers"))
                .expect("create handlers dir");
            Self { dir }
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent dirs");
            }
            fs::write(path, content).expect("write fixture file");
        }

        /// Root `index.html` served by the dev bridge.
        pub fn with_index(self, html: &str) -> Self {
            self.write("index.html", html);
            self
        }

        /// A handler file following the `{name}.handler.ts` convention.
        pub fn with_handler(self, name: &str) -> Self {
            self.write(
                &format!("src/server/handlers/{name}.handler.ts"),
                "export default async () => ({})\n",
            );
            self
        }

        /// A file under the public `assets/` directory.
        pub fn with_asset(self, rel: &str, content: &str) -> Self {
            self.write(&format!("assets/{rel}"), content);
            self
        }

        /// A built stylesheet under `dist/assets/`.
        pub fn with_built_css(self, name: &str, content: &str) -> Self {
            self.write(&format!("dist/assets/{name}"), content);
            self
        }

        /// A file in the built client bundle under `dist/client/`.
        pub fn with_client_bundle(self, rel: &str, content: &str) -> Self {
            self.write(&format!("dist/client/{rel}"), content);
            self
        }

        /// A file under the source tree, e.g. `client/app.js`.
        pub fn with_source(self, rel: &str, content: &str) -> Self {
            self.write(&format!("src/{rel}"), content);
            self
        }

        /// Config over this root: loopback host, ephemeral port.
        pub fn config(&self, mode: ExecutionMode) -> AppConfig {
            let mut config = AppConfig::with_root(self.path(), mode);
            config.host = "127.0.0.1".to_string();
            config.port = 0;
            config
        }
    }

    impl Default for TempAppRoot {
        fn default() -> Self {
            Self::new()
        }
    }
}

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn get(addr: &SocketAddr, path: &str) -> String {
        send_request(addr, &format!("GET {path} HTTP/1.1\r\nHost: x\r\n\r\n"))
    }

    /// Split a raw HTTP response into (status, content type, body).
    pub fn parse_parts(resp: &str) -> (u16, String, String) {
        let mut parts = resp.split("\r\n\r\n");
        let headers = parts.next().unwrap_or("");
        let body = parts.next().unwrap_or("").to_string();
        let mut status = 0;
        let mut content_type = String::new();
        for line in headers.lines() {
            if line.starts_with("HTTP/1.1") {
                status = line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("0")
                    .parse()
                    .unwrap();
            } else if let Some((name, val)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-type") {
                    content_type = val.trim().to_string();
                }
            }
        }
        (status, content_type, body)
    }
}
