use anyhow::{Result, anyhow, bail};
use regex::Regex;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;

/// Upper bound on a single WHOIS answer
const MAX_WHOIS_RESPONSE: u64 = 256 * 1024;

/// Markers registries use when a query matched nothing
const NO_MATCH_MARKERS: &[&str] = &[
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "no object found",
    "status: free",
    "status: available",
];

/// Labels registries put in front of the registered name
const OWNER_LABELS: &[&str] = &["domain name:", "domain:", "[domain name]"];

static ROUND_TRIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time[=<]\s*([0-9]+(?:[.,][0-9]+)?)\s*ms").expect("round trip pattern is valid")
});

/// WHOIS (RFC 3912) registration checker
pub struct WhoisChecker {
    server: String,
    port: u16,
    timeout_duration: Duration,
}

impl WhoisChecker {
    pub fn new(server: impl Into<String>, port: u16, timeout_seconds: u64) -> Self {
        Self {
            server: server.into(),
            port,
            timeout_duration: Duration::from_secs(timeout_seconds),
        }
    }

    /// Whether `domain` has an owner record.
    ///
    /// Asks the root server which registry serves the TLD, then asks that
    /// registry about the domain itself. Both hops use the configured port.
    pub async fn is_registered(&self, domain: &str) -> Result<bool> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            bail!("empty domain");
        }

        let tld = domain.rsplit('.').next().unwrap_or(domain.as_str());
        let root_answer = self.query(&self.server, self.port, tld).await?;

        let answer = match parse_referral(&root_answer) {
            Some(registry) => self.query(&registry, self.port, &domain).await?,
            None => self.query(&self.server, self.port, &domain).await?,
        };

        Ok(has_owner_record(&answer))
    }

    async fn query(&self, server: &str, port: u16, query: &str) -> Result<String> {
        let exchange = async {
            let mut stream = TcpStream::connect((server, port))
                .await
                .map_err(|e| anyhow!("WHOIS connection to {} failed: {}", server, e))?;

            stream.write_all(format!("{query}\r\n").as_bytes()).await?;

            let mut raw = Vec::new();
            (&mut stream).take(MAX_WHOIS_RESPONSE).read_to_end(&mut raw).await?;
            Ok::<_, anyhow::Error>(String::from_utf8_lossy(&raw).into_owned())
        };

        timeout(self.timeout_duration, exchange)
            .await
            .map_err(|_| anyhow!("WHOIS query to {} timed out", server))?
    }
}

/// Registry named by a `refer:` or `whois:` line of a root answer
fn parse_referral(answer: &str) -> Option<String> {
    answer.lines().find_map(|line| {
        let (label, value) = line.split_once(':')?;
        let label = label.trim().to_ascii_lowercase();
        let value = value.trim();
        ((label == "refer" || label == "whois") && !value.is_empty()).then(|| value.to_string())
    })
}

/// A labelled domain name and no "no match" style marker
fn has_owner_record(answer: &str) -> bool {
    let lower = answer.to_ascii_lowercase();
    if NO_MATCH_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return false;
    }

    let mut lines = lower.lines().peekable();
    while let Some(line) = lines.next() {
        let line = line.trim_start();
        let Some(value) = OWNER_LABELS.iter().find_map(|label| line.strip_prefix(label)) else {
            continue;
        };
        if !value.trim().is_empty() {
            return true;
        }
        // Nominet puts the value on the next, indented line
        if lines
            .peek()
            .is_some_and(|next| next.starts_with([' ', '\t']) && !next.trim().is_empty())
        {
            return true;
        }
    }
    false
}

/// ICMP echo checker backed by the system `ping`
pub struct PingChecker {
    program: String,
    timeout_duration: Duration,
}

impl PingChecker {
    pub fn new(program: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            program: program.into(),
            timeout_duration: Duration::from_secs(timeout_seconds),
        }
    }

    /// Send one echo request and return the round trip in milliseconds
    pub async fn ping(&self, host: &str) -> Result<f64> {
        if host.is_empty() || host.starts_with('-') {
            bail!("invalid ping target: {:?}", host);
        }

        let wait = self.timeout_duration.as_secs().max(1).to_string();
        let mut command = Command::new(&self.program);
        command
            .args(["-c", "1", "-W", wait.as_str(), host])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // One extra second for process start-up on top of ping's own wait
        let output = timeout(self.timeout_duration + Duration::from_secs(1), command.output())
            .await
            .map_err(|_| anyhow!("ping {} timed out", host))?
            .map_err(|e| anyhow!("failed to run {}: {}", self.program, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} is unreachable: {}", host, stderr.trim());
        }

        parse_round_trip(&stdout).ok_or_else(|| anyhow!("no round trip time in ping output"))
    }
}

fn parse_round_trip(output: &str) -> Option<f64> {
    if output.to_ascii_lowercase().contains("unreachable") {
        return None;
    }

    let captures = ROUND_TRIP.captures(output)?;
    captures[1].replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    const IANA_COM: &str = "\
% IANA WHOIS server
% for more information on IANA, visit http://www.iana.org

refer:        whois.verisign-grs.com

domain:       COM
";

    const VERISIGN_HIT: &str = "\
   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Registrar WHOIS Server: whois.iana.org
";

    const NOMINET_HIT: &str = "\

    Domain name:
        bbc.co.uk

    Data validation:
        Nominet was able to match the registrant's name and address
";

    const JPRS_HIT: &str = "\
[ JPRS database provides information on network administration. ]

Domain Information:
[Domain Name]                   EXAMPLE.JP

[Registrant]                    Japan Registry Services Co.,Ltd.
";

    const VERISIGN_MISS: &str = "No match for \"SURELY-NOT-TAKEN-1234.COM\".\r\n>>> Last update of whois database <<<\r\n";

    #[test]
    fn test_parse_referral() {
        assert_eq!(parse_referral(IANA_COM).as_deref(), Some("whois.verisign-grs.com"));
        assert_eq!(parse_referral("whois: whois.nic.io\n").as_deref(), Some("whois.nic.io"));
        assert_eq!(parse_referral("% nothing here\n"), None);
    }

    #[test]
    fn test_owner_record_detection() {
        assert!(has_owner_record(VERISIGN_HIT));
        assert!(!has_owner_record(VERISIGN_MISS));
        assert!(!has_owner_record(""));
        assert!(!has_owner_record("Domain Name:\n"));
        assert!(!has_owner_record("Domain name:\n\nRegistrar:\n"));
    }

    #[test]
    fn test_owner_record_on_following_line() {
        assert!(has_owner_record(NOMINET_HIT));
    }

    #[test]
    fn test_owner_record_bracketed_label() {
        assert!(has_owner_record(JPRS_HIT));
        assert!(!has_owner_record("[Domain Name]\n"));
    }

    #[test]
    fn test_parse_linux_ping_output() {
        let output = "\
PING 1.1.1.1 (1.1.1.1) 56(84) bytes of data.
64 bytes from 1.1.1.1: icmp_seq=1 ttl=57 time=12.4 ms

--- 1.1.1.1 ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms
rtt min/avg/max/mdev = 12.4/12.4/12.4/0.000 ms
";
        assert_eq!(parse_round_trip(output), Some(12.4));
    }

    #[test]
    fn test_parse_sub_millisecond_ping_output() {
        let output = "Reply from 127.0.0.1: bytes=32 time<1ms TTL=128\n";
        assert_eq!(parse_round_trip(output), Some(1.0));
    }

    #[test]
    fn test_parse_unreachable_ping_output() {
        let output = "From 10.0.0.1 icmp_seq=1 Destination Host Unreachable\n";
        assert_eq!(parse_round_trip(output), None);
    }

    #[tokio::test]
    async fn test_ping_rejects_option_like_targets() {
        let checker = PingChecker::new("ping", 1);
        assert!(checker.ping("-f").await.is_err());
        assert!(checker.ping("").await.is_err());
    }

    #[tokio::test]
    async fn test_ping_missing_program_is_an_error() {
        let checker = PingChecker::new("/nonexistent/ping", 1);
        assert!(checker.ping("127.0.0.1").await.is_err());
    }

    #[tokio::test]
    async fn test_whois_empty_domain_is_an_error() {
        let checker = WhoisChecker::new("whois.iana.org", 43, 1);
        assert!(checker.is_registered(" . ").await.is_err());
    }

    /// Answer `connections` WHOIS queries on `listener`, returning the queries seen
    async fn serve_whois(
        listener: TcpListener,
        connections: usize,
        answer: fn(&str) -> String,
    ) -> Vec<String> {
        let mut queries = Vec::new();
        for _ in 0..connections {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            BufReader::new(&mut stream).read_line(&mut line).await.unwrap();
            let query = line.trim_end().to_string();
            stream.write_all(answer(&query).as_bytes()).await.unwrap();
            queries.push(query);
        }
        queries
    }

    fn test_registry(query: &str) -> String {
        match query {
            "test" => "refer:        127.0.0.1\n\ndomain:       TEST\n".to_string(),
            "example.test" => "Domain Name: EXAMPLE.TEST\n".to_string(),
            _ => format!("No match for \"{}\".\n", query.to_ascii_uppercase()),
        }
    }

    #[tokio::test]
    async fn test_whois_follows_referral() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_whois(listener, 2, test_registry));

        let checker = WhoisChecker::new("127.0.0.1", port, 5);
        assert!(checker.is_registered("Example.Test.").await.unwrap());

        assert_eq!(server.await.unwrap(), ["test", "example.test"]);
    }

    #[tokio::test]
    async fn test_whois_referral_without_owner_record() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_whois(listener, 2, test_registry));

        let checker = WhoisChecker::new("127.0.0.1", port, 5);
        assert!(!checker.is_registered("free.test").await.unwrap());

        assert_eq!(server.await.unwrap(), ["test", "free.test"]);
    }

    #[tokio::test]
    async fn test_whois_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accept and hold connections without ever answering
        let _silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let checker = WhoisChecker::new("127.0.0.1", port, 1);
        let started = Instant::now();
        let result = checker.is_registered("example.com").await;

        assert!(result.unwrap_err().to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    /// Write an executable shell script standing in for `ping`
    #[cfg(unix)]
    fn fake_ping(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ping");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ping_passes_target_and_reads_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_ping(
            dir.path(),
            r#"[ "$1" = "-c" ] && [ "$3" = "-W" ] && [ "$5" = "127.0.0.1" ] || exit 2
echo "64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=3.2 ms""#,
        );

        let checker = PingChecker::new(program, 1);
        assert_eq!(checker.ping("127.0.0.1").await.unwrap(), 3.2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ping_failure_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_ping(dir.path(), "echo '1 packets transmitted, 0 received'\nexit 1");

        let checker = PingChecker::new(program, 1);
        assert!(checker.ping("10.255.255.1").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ping_hung_process_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_ping(dir.path(), "exec sleep 30");

        let checker = PingChecker::new(program, 1);
        let started = Instant::now();
        let result = checker.ping("127.0.0.1").await;

        assert!(result.unwrap_err().to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
