//! Streaming behavior under timing pressure.

use futures::StreamExt;
use reinhardt_ppr_core::{
	DynamicProps, IntoNode, Node, RequestData, ResolveStrategy, Suspend,
};
use reinhardt_ppr_shell::{ShellConfig, StaticShell, render_to_static_shell};
use reinhardt_ppr_streaming::{StreamCallbacks, StreamOptions, generate_ppr_response};
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn delayed(label: &'static str, millis: u64) -> Node {
	Node::component_fn("Delayed", move |_| {
		Ok(Suspend::pending(async move {
			tokio::time::sleep(Duration::from_millis(millis)).await;
			Ok(Node::element("span").child(label).into_node())
		}))
	})
}

async fn shell_for(tree: &Node) -> Arc<StaticShell> {
	Arc::new(
		render_to_static_shell(tree, "/", &ShellConfig::default())
			.await
			.unwrap(),
	)
}

async fn drain(shell: Arc<StaticShell>, tree: Arc<Node>, options: StreamOptions) -> Vec<String> {
	generate_ppr_response(shell, tree, options)
		.into_stream()
		.map(|chunk| String::from_utf8(chunk.unwrap().to_vec()).unwrap())
		.collect()
		.await
}

fn inject_order(chunks: &[String]) -> Vec<String> {
	chunks
		.iter()
		.filter_map(|chunk| {
			let rest = chunk.strip_prefix("<script>window.__REINHARDT_PPR__.inject('")?;
			rest.split('\'').next().map(str::to_string)
		})
		.collect()
}

#[rstest]
#[case(ResolveStrategy::Sequential)]
#[case(ResolveStrategy::Concurrent)]
#[tokio::test]
async fn test_higher_priority_streams_first_even_when_slower(#[case] strategy: ResolveStrategy) {
	let tree = Arc::new(Node::fragment([
		Node::dynamic(DynamicProps::new(delayed("ten", 5)).priority(10)),
		Node::dynamic(DynamicProps::new(delayed("one", 1)).priority(1)),
	]));
	let shell = shell_for(&tree).await;

	let chunks = drain(shell, tree, StreamOptions::default().with_strategy(strategy)).await;
	assert_eq!(inject_order(&chunks), vec!["dynamic-0", "dynamic-1"]);
}

#[rstest]
#[case(ResolveStrategy::Sequential)]
#[case(ResolveStrategy::Concurrent)]
#[tokio::test]
async fn test_priorities_ten_one_five_stream_as_ten_five_one(#[case] strategy: ResolveStrategy) {
	let tree = Arc::new(Node::fragment([
		Node::dynamic(DynamicProps::new("p10").id("p10").priority(10)),
		Node::dynamic(DynamicProps::new("p1").id("p1").priority(1)),
		Node::dynamic(DynamicProps::new("p5").id("p5").priority(5)),
		Node::dynamic(DynamicProps::new("p5b").id("p5b").priority(5)),
	]));
	let shell = shell_for(&tree).await;

	let chunks = drain(shell, tree, StreamOptions::default().with_strategy(strategy)).await;
	assert_eq!(inject_order(&chunks), vec!["p10", "p5", "p5b", "p1"]);
}

#[rstest]
#[tokio::test]
async fn test_timed_out_boundary_does_not_block_stream_completion() {
	let tree = Arc::new(
		Node::element("main")
			.child(DynamicProps::new(delayed("slow", 200)).id("slow").priority(9))
			.child(DynamicProps::new(delayed("fast", 1)).id("fast"))
			.into_node(),
	);
	let shell = shell_for(&tree).await;

	let completed = Arc::new(AtomicUsize::new(0));
	let done = Arc::clone(&completed);
	let options = StreamOptions::default()
		.with_timeout(Duration::from_millis(20))
		.with_strategy(ResolveStrategy::Concurrent)
		.with_callbacks(StreamCallbacks::new().on_complete(move || {
			done.fetch_add(1, Ordering::SeqCst);
		}));

	let started = std::time::Instant::now();
	let chunks = drain(shell, tree, options).await;
	assert!(started.elapsed() < Duration::from_millis(200));

	let body = chunks.concat();
	let slow_script = chunks
		.iter()
		.find(|c| c.contains(".inject('slow'"))
		.unwrap();
	assert!(slow_script.contains("Error loading content"));
	assert!(body.contains("<span>fast<\\/span>"));
	assert!(body.ends_with("</html>"));
	assert_eq!(completed.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn test_shell_bytes_precede_any_boundary_work() {
	let tree = Arc::new(
		Node::element("main")
			.child(Node::element("h1").child("Title"))
			.child(DynamicProps::new(delayed("late", 50)).fallback("Loading..."))
			.into_node(),
	);
	let shell = shell_for(&tree).await;

	let mut stream = generate_ppr_response(shell, tree, StreamOptions::default()).into_stream();
	let mut head = String::new();
	while !head.contains("register(") {
		let chunk = stream.next().await.unwrap().unwrap();
		head.push_str(std::str::from_utf8(&chunk).unwrap());
	}
	assert!(head.contains("<h1>Title</h1>"));
	assert!(head.contains("Loading..."));
	assert!(!head.contains("late"));
}

#[rstest]
#[tokio::test]
async fn test_request_data_reaches_components() {
	let tree = Arc::new(Node::dynamic(DynamicProps::new(Node::component_fn(
		"UserGreeting",
		|scope| {
			let name = scope.cookie("name").unwrap_or("guest").to_string();
			Ok(Suspend::ready(format!("Hello, {}", name)))
		},
	))));
	let shell = shell_for(&tree).await;

	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&seen);
	let options = StreamOptions::default()
		.with_request_data(RequestData::new().cookie("name", "Ana"))
		.with_callbacks(StreamCallbacks::new().on_boundary_resolved(move |id| {
			sink.lock().unwrap().push(id.to_string());
		}));

	let body = drain(shell, tree, options).await.concat();
	assert!(body.contains("Hello, Ana"));
	assert_eq!(*seen.lock().unwrap(), vec!["dynamic-0"]);
}
