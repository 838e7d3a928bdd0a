//! End-to-end tests: whole sessions driven over in-memory duplex streams.

use std::cell::Cell;
use std::io;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, Lines,
    ReadBuf, ReadHalf, WriteHalf,
};
use tokio::time::timeout;

use chat_broker::{Broker, Config};

const WAIT: Duration = Duration::from_secs(2);

struct TestClient {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl TestClient {
    fn connect(broker: &Broker, addr: &str) -> Self {
        let (client, server) = tokio::io::duplex(8192);
        broker.spawn_session(server, addr.to_string());
        let (reader, writer) = tokio::io::split(client);
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> String {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for line")
            .unwrap()
            .expect("stream closed")
    }

    /// Assert nothing arrives within a short window
    async fn assert_silent(&mut self) {
        let res = timeout(Duration::from_millis(100), self.lines.next_line()).await;
        assert!(res.is_err(), "unexpected line: {:?}", res);
    }
}

#[tokio::test]
async fn test_presence_rename_and_directed_scenario() {
    let broker = Broker::start(&Config::default());

    let mut a = TestClient::connect(&broker, "1.2.3.4:5");
    assert_eq!(a.recv().await, "[1.2.3.4:5]1.2.3.4:5:已上线");

    a.send("who").await;
    assert_eq!(a.recv().await, "[1.2.3.4:5]1.2.3.4:5:当前在线...");
    a.assert_silent().await;

    a.send("rename|alice").await;
    assert_eq!(a.recv().await, "您已更新用户名为：alice");

    let mut b = TestClient::connect(&broker, "5.6.7.8:9");
    assert_eq!(b.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");
    assert_eq!(a.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");

    b.send("to|alice|hi").await;
    assert_eq!(a.recv().await, "5.6.7.8:9对您说：hi");
    b.assert_silent().await;

    b.send("to|bob|hi").await;
    assert_eq!(b.recv().await, "该用户名不存在！");
    a.assert_silent().await;
}

#[tokio::test]
async fn test_broadcast_reaches_everyone_once() {
    let broker = Broker::start(&Config::default());

    let mut clients: Vec<TestClient> = Vec::new();
    for i in 0..4 {
        let addr = format!("10.0.0.{}:1000", i);
        let mut client = TestClient::connect(&broker, &addr);
        // Each client sees its own join notice and every later one
        assert_eq!(client.recv().await, format!("[{}]{}:已上线", addr, addr));
        for c in clients.iter_mut() {
            assert_eq!(c.recv().await, format!("[{}]{}:已上线", addr, addr));
        }
        clients.push(client);
    }

    clients[0].send("hello everyone").await;

    for client in clients.iter_mut() {
        assert_eq!(client.recv().await, "[10.0.0.0:1000]10.0.0.0:1000:hello everyone");
        client.assert_silent().await;
    }
}

#[tokio::test]
async fn test_rename_visible_to_who_from_others() {
    let broker = Broker::start(&Config::default());

    let mut a = TestClient::connect(&broker, "1.2.3.4:5");
    assert_eq!(a.recv().await, "[1.2.3.4:5]1.2.3.4:5:已上线");
    let mut b = TestClient::connect(&broker, "5.6.7.8:9");
    assert_eq!(b.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");
    assert_eq!(a.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");

    a.send("rename|alice").await;
    assert_eq!(a.recv().await, "您已更新用户名为：alice");

    b.send("who").await;
    let mut roster = vec![b.recv().await, b.recv().await];
    roster.sort();
    assert_eq!(
        roster,
        vec![
            "[1.2.3.4:5]alice:当前在线...".to_string(),
            "[5.6.7.8:9]5.6.7.8:9:当前在线...".to_string(),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_renames_exactly_one_wins() {
    let broker = Broker::start(&Config::default());

    let mut a = TestClient::connect(&broker, "1.2.3.4:5");
    assert_eq!(a.recv().await, "[1.2.3.4:5]1.2.3.4:5:已上线");
    let mut b = TestClient::connect(&broker, "5.6.7.8:9");
    assert_eq!(b.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");
    assert_eq!(a.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");

    tokio::join!(a.send("rename|carol"), b.send("rename|carol"));
    let (ra, rb) = tokio::join!(a.recv(), b.recv());

    let ok = "您已更新用户名为：carol";
    let taken = "当前用户名已被使用！";
    assert!(
        (ra == ok && rb == taken) || (ra == taken && rb == ok),
        "a got {:?}, b got {:?}",
        ra,
        rb
    );

    assert!(broker.registry().contains("carol"));
    assert_eq!(broker.registry().len(), 2);
}

#[tokio::test]
async fn test_disconnect_announces_and_frees_name() {
    let broker = Broker::start(&Config::default());

    let mut a = TestClient::connect(&broker, "1.2.3.4:5");
    assert_eq!(a.recv().await, "[1.2.3.4:5]1.2.3.4:5:已上线");
    let mut b = TestClient::connect(&broker, "5.6.7.8:9");
    assert_eq!(b.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");
    assert_eq!(a.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");

    b.send("rename|bob").await;
    assert_eq!(b.recv().await, "您已更新用户名为：bob");
    drop(b);

    assert_eq!(a.recv().await, "[5.6.7.8:9]bob:已下线");
    assert!(!broker.registry().contains("bob"));

    // The vacated name is immediately reusable
    a.send("rename|bob").await;
    assert_eq!(a.recv().await, "您已更新用户名为：bob");

    a.send("to|5.6.7.8:9|still there?").await;
    assert_eq!(a.recv().await, "该用户名不存在！");
}

#[tokio::test]
async fn test_unterminated_final_line_is_processed() {
    let broker = Broker::start(&Config::default());

    let mut a = TestClient::connect(&broker, "1.2.3.4:5");
    assert_eq!(a.recv().await, "[1.2.3.4:5]1.2.3.4:5:已上线");
    let mut b = TestClient::connect(&broker, "5.6.7.8:9");
    assert_eq!(b.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");
    assert_eq!(a.recv().await, "[5.6.7.8:9]5.6.7.8:9:已上线");

    b.writer.write_all(b"last words").await.unwrap();
    b.writer.shutdown().await.unwrap();

    assert_eq!(a.recv().await, "[5.6.7.8:9]5.6.7.8:9:last words");
    assert_eq!(a.recv().await, "[5.6.7.8:9]5.6.7.8:9:已下线");
}

/// Transport that is `Send` but not `Sync`
struct SendOnly {
    inner: DuplexStream,
    _not_sync: PhantomData<Cell<()>>,
}

impl AsyncRead for SendOnly {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for SendOnly {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[tokio::test]
async fn test_session_over_non_sync_stream() {
    let broker = Broker::start(&Config::default());

    let (client, server) = tokio::io::duplex(8192);
    broker.spawn_session(
        SendOnly {
            inner: server,
            _not_sync: PhantomData,
        },
        "1.2.3.4:5".to_string(),
    );
    let (reader, writer) = tokio::io::split(client);
    let mut a = TestClient {
        lines: BufReader::new(reader).lines(),
        writer,
    };

    assert_eq!(a.recv().await, "[1.2.3.4:5]1.2.3.4:5:已上线");
    a.send("who").await;
    assert_eq!(a.recv().await, "[1.2.3.4:5]1.2.3.4:5:当前在线...");
}
