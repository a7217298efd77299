fn main() -> anyhow::Result<()> {
    clipper_cli::run()
}
