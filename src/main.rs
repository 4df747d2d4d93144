use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use inkpad::auth::{handlers, nav};
use inkpad::config::{Cli, Command, Config};
use inkpad::feed::view::{excerpt, ViewState, EXCERPT_CHARS};
use inkpad::gateway::HttpGateway;
use inkpad::models::{Credentials, ImageUpload, Post, PostDraft, Registration};
use inkpad::mutation::{FeedSource, Outcome};
use inkpad::notify::Level;
use inkpad::search::SearchState;
use inkpad::state::AppState;
use inkpad::validate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    tracing::info!("Using API at {}", config.api.base_url);

    let gateway = HttpGateway::new(&config.api.base_url, config.request_timeout())?;
    let state = AppState::new(config, Arc::new(gateway));

    handlers::bootstrap(&state.remote).await;
    if let (Some(email), Some(password)) = (cli.email.clone(), cli.password.clone()) {
        handlers::login(&state.remote, Credentials { email, password }).await?;
    }

    let result = run(&state, cli.command).await;
    flush_notices(&state);
    result
}

async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Feed { genre, page } => {
            let source = match genre {
                Some(genre) => FeedSource::Genre(genre),
                None => FeedSource::All,
            };
            state.posts.load(source).await?;
            print_page(state, page).await;
        }
        Command::Mine => {
            state.posts.load(FeedSource::Mine).await?;
            print_page(state, 1).await;
        }
        Command::Show { id } => {
            state.posts.load(FeedSource::Single(id.clone())).await?;
            if let Some(post) = state.posts.store().get(&id).await {
                print_post(&post, true);
                for comment in &post.comments {
                    let author = comment
                        .author
                        .as_ref()
                        .and_then(|a| a.username())
                        .unwrap_or("unknown");
                    println!("    [{}] {}: {}", comment.id, author, comment.text);
                }
            }
        }
        Command::Search { query } => match state.search.submit(&query).await {
            SearchState::Results { hits, .. } => {
                for hit in hits {
                    println!("{}  {}  ({})", hit.id, hit.title, hit.genre);
                }
            }
            _ => println!("No blogs found."),
        },
        Command::Like { id } => {
            state.posts.load(FeedSource::Single(id.clone())).await?;
            if let Outcome::Committed(likes) = state.posts.toggle_like(&id).await? {
                println!("{} like(s)", likes.len());
            }
        }
        Command::Comment { id, text } => {
            state.posts.load(FeedSource::Single(id.clone())).await?;
            if let Outcome::Committed(comments) = state.posts.add_comment(&id, &text).await? {
                println!("{} comment(s)", comments.len());
            }
        }
        Command::Uncomment {
            post_id,
            comment_id,
        } => {
            state.posts.load(FeedSource::Single(post_id.clone())).await?;
            state.posts.delete_comment(&post_id, &comment_id).await?;
        }
        Command::Delete { id } => {
            state.posts.load(FeedSource::Single(id.clone())).await?;
            state.posts.delete_post(&id).await?;
        }
        Command::Publish {
            title,
            content,
            genre,
            image,
        } => {
            let image = match image {
                Some(path) => Some(ImageUpload::from_path(&path).await?),
                None => None,
            };
            let post = state
                .posts
                .create_post(PostDraft {
                    title,
                    content,
                    genre,
                    image,
                })
                .await?;
            println!("Published {}", post.id);
        }
        Command::Genres => {
            for genre in validate::GENRES {
                println!("{:<12} /genre/{}", genre, validate::genre_slug(genre));
            }
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let user_id = handlers::register(
                &state.remote,
                Registration {
                    username,
                    email,
                    password,
                },
            )
            .await?;
            println!("Registered user {}", user_id);
        }
        Command::Logout => handlers::logout(&state.remote).await,
        Command::Users => {
            let dashboard = state.posts.admin_dashboard().await?;
            let mut view = ViewState::new(state.config.feed.page_size);
            loop {
                for user in view.pager.slice(&dashboard.users) {
                    println!(
                        "{}  {}  {}  {}",
                        user.id,
                        user.username,
                        user.email.as_deref().unwrap_or("-"),
                        String::from(user.role)
                    );
                }
                if !view.pager.next(dashboard.users.len()) {
                    break;
                }
            }
            println!(
                "{} users, {} blogs",
                dashboard.users.len(),
                dashboard.post_count
            );
        }
        Command::Whoami => {
            let session = state.session.current().await;
            match &session {
                Some(s) => println!("{} ({}) {:?}", s.username, s.user_id, s.role),
                None => println!("Not signed in"),
            }
            let items: Vec<_> = nav::navigation(session.as_ref())
                .into_iter()
                .map(nav::NavItem::label)
                .collect();
            println!("{}", items.join(" | "));
        }
    }
    Ok(())
}

async fn print_page(state: &AppState, page: usize) {
    let posts = state.posts.store().snapshot().await;
    let mut view = ViewState::new(state.config.feed.page_size);
    view.pager.go_to(page, posts.len());

    for post in view.pager.slice(&posts) {
        print_post(post, false);
    }
    println!(
        "-- page {} of {} --",
        view.pager.page(),
        view.pager.total_pages(posts.len())
    );
}

fn print_post(post: &Post, full: bool) {
    let author = post
        .author
        .as_ref()
        .and_then(|a| a.username())
        .unwrap_or("unknown");
    println!(
        "{}  {} [{}] by {}  ♥ {}  💬 {}",
        post.id,
        post.title,
        post.genre,
        author,
        post.liked_by.len(),
        post.comments.len()
    );
    if full {
        println!("  {}", post.content);
    } else {
        println!("  {}", excerpt(&post.content, EXCERPT_CHARS));
    }
}

fn flush_notices(state: &AppState) {
    for notice in state.notices.drain() {
        match notice.level {
            Level::Success => eprintln!("✓ {}", notice.message),
            Level::Warning => eprintln!("! {}", notice.message),
            Level::Error => eprintln!("✗ {}", notice.message),
        }
    }
}
