#[cfg(feature = "ssr")]
use supportchat::client::{ChatClient, ChatSession, FileStore, WeatherClient};
#[cfg(feature = "ssr")]
use supportchat::types::{FeedbackKind, RatingRequest, Role};

#[cfg(feature = "ssr")]
const HELP: &str = "Commands: /good, /bad, /rate N [comments], /theme, /weather, /history, /quit";

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::env;
    use std::io::Write;
    use tokio::io::{AsyncBufReadExt, BufReader};

    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let server = env::var("SUPPORT_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let history_path =
        env::var("SUPPORT_HISTORY_PATH").unwrap_or_else(|_| ".supportchat/history.json".to_string());

    let client = ChatClient::new(server);
    let weather = env::var("OPENWEATHER_API_KEY").ok().map(WeatherClient::new);
    let mut session = ChatSession::open(FileStore::new(history_path));

    session.subscribe(|_, text| {
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
            log::debug!("Failed to write reply to stdout: {e}");
        }
    });

    println!("Chat with Support ({:?} theme). {HELP}", session.theme());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("/quit", _) => break,
            ("/history", _) => {
                for turn in session.turns() {
                    println!("[{}] {}", turn.role, turn.content);
                }
            }
            ("/theme", _) => println!("Theme is now {:?}", session.toggle_theme()?),
            (cmd @ ("/good" | "/bad"), _) => {
                let kind = if cmd == "/good" {
                    FeedbackKind::Positive
                } else {
                    FeedbackKind::Negative
                };
                match session.submit_feedback(&client, kind).await {
                    Ok(true) => print_last_assistant(&session),
                    Ok(false) => println!("Nothing to give feedback on yet."),
                    Err(e) => eprintln!("Error submitting feedback: {e}"),
                }
            }
            ("/rate", rest) => {
                let (rating, comments) = rest.split_once(' ').unwrap_or((rest, ""));
                let request = RatingRequest {
                    rating: rating.parse().ok(),
                    comments: comments.to_string(),
                };
                match client.send_rating(&request).await {
                    Ok(_) => println!("Feedback submitted successfully!"),
                    Err(e) => eprintln!("{e}"),
                }
            }
            ("/weather", _) => match &weather {
                Some(weather) => match session.append_weather(weather).await {
                    Ok(()) => print_last_assistant(&session),
                    Err(e) => eprintln!("Error fetching weather: {e}"),
                },
                None => println!("Set OPENWEATHER_API_KEY to enable weather lookups."),
            },
            (cmd, _) if cmd.starts_with('/') => println!("{HELP}"),
            _ => {
                let result = session.send_message(&client, line).await;
                println!();
                if let Err(e) = result {
                    eprintln!("Error: {e}");
                }
            }
        }
    }

    Ok(())
}

#[cfg(feature = "ssr")]
fn print_last_assistant(session: &ChatSession<FileStore>) {
    if let Some(turn) = session.turns().last().filter(|t| t.role == Role::Assistant) {
        println!("{}", turn.content);
    }
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("This binary requires the 'ssr' feature");
    std::process::exit(1);
}
