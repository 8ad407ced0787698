use post_feed::app::{self, RunOptions};

enum Mode {
    Interactive,
    List,
    Done,
}

fn main() {
    let (mode, opts) = match parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };

    let result = match mode {
        Mode::Done => return,
        Mode::Interactive => app::run(opts),
        Mode::List => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            app::list(opts, &mut out)
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<(Mode, RunOptions), String> {
    let mut opts = RunOptions::default();
    let mut mode = Mode::Interactive;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("post-feed {}", post_feed::VERSION);
                return Ok((Mode::Done, opts));
            }
            "--help" | "-h" => {
                println!(
                    "post-feed - Browse, rank and search a JSON post feed from the terminal.\n\n  --feed <url|path>    Load posts from this URL or file instead of feed.url\n  --demo               Use the built-in sample posts\n  --list               Print the first page of posts and exit\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message"
                );
                return Ok((Mode::Done, opts));
            }
            "--feed" => match args.next() {
                Some(value) => opts.feed_override = Some(value),
                None => return Err("--feed needs a URL or path".to_string()),
            },
            "--demo" => opts.demo = true,
            "--list" => mode = Mode::List,
            other => {
                if let Some(value) = other.strip_prefix("--feed=") {
                    opts.feed_override = Some(value.to_string());
                } else {
                    return Err(format!("unknown argument {other:?}"));
                }
            }
        }
    }

    Ok((mode, opts))
}
