mod mixer;
mod scene;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // Optional path to a mono WAV file; a synthesized tone is used otherwise.
    let args: Vec<String> = std::env::args().collect();
    scene::run(args.get(1).map(String::as_str))
}
