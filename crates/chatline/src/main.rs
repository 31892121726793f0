//! A simple terminal client for chatting with a streaming agent
//! endpoint.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatline::visitor::provision_visitor_id;
use chatline::{EndpointConfigBuilder, HttpEndpoint};
use chatline_core::ChatSessionBuilder;
use chatline_core::transcript::{Speaker, Transcript};
use chatline_transport::Channel;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";
const GREETING: &str = "Hello! How can I assist you today?";

#[derive(Default)]
struct RenderState {
    rendered: String,
    spinner: Option<ProgressBar>,
}

impl RenderState {
    fn begin(&mut self, spinner: ProgressBar) {
        self.rendered.clear();
        self.spinner = Some(spinner);
    }

    fn render_reply(&mut self, text: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
            print!("{}🤖 ", BAR_CHAR.bright_cyan());
        }
        if let Some(suffix) = text.strip_prefix(self.rendered.as_str()) {
            print!("{}", suffix.bright_white());
        } else {
            // The reply was replaced wholesale (error marker or
            // fallback), start over on a fresh line.
            print!("\n{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white());
        }
        std::io::stdout().flush().unwrap();
        self.rendered = text.to_owned();
    }

    fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

fn on_snapshot(render: &Mutex<RenderState>, transcript: &Transcript) {
    let Some(entry) = transcript.last() else {
        return;
    };
    if entry.speaker != Speaker::Agent {
        return;
    }
    render.lock().unwrap().render_reply(&entry.text);
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(url) = env::var("CHATLINE_AGENT_URL") else {
        eprintln!("CHATLINE_AGENT_URL environment variable is not set");
        return;
    };
    let channel = match env::var("CHATLINE_CHANNEL") {
        Ok(tag) => {
            let Some(channel) = parse_channel(&tag) else {
                eprintln!("unknown channel: {tag}");
                return;
            };
            Some(channel)
        }
        Err(_) => None,
    };

    let visitor_id = provision_visitor_id();
    debug!("visitor id: {visitor_id}");

    let endpoint =
        HttpEndpoint::new(EndpointConfigBuilder::with_url(url).build());
    let render = Arc::new(Mutex::new(RenderState::default()));

    let mut builder = ChatSessionBuilder::with_endpoint(endpoint, visitor_id)
        .with_seed_entry(Speaker::Human, "hello")
        .with_seed_entry(Speaker::Agent, GREETING)
        .on_transcript({
            let render = Arc::clone(&render);
            move |transcript| {
                on_snapshot(&render, transcript);
            }
        });
    if let Some(channel) = channel {
        builder = builder.with_channel(channel);
    }
    let mut session = builder.build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    println!("{}🤖 {}", BAR_CHAR.bright_cyan(), GREETING.bright_white());

    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(progress_style.clone());
        spinner.set_message("🤔 Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        render.lock().unwrap().begin(spinner);

        session.submit(message).await;

        render.lock().unwrap().finish();
        println!();
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

#[inline]
fn parse_channel(tag: &str) -> Option<Channel> {
    match tag {
        "dashboard" => Some(Channel::Dashboard),
        "website" => Some(Channel::Website),
        "slack" => Some(Channel::Slack),
        "crisp" => Some(Channel::Crisp),
        _ => None,
    }
}
