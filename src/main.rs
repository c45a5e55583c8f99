fn main() -> anyhow::Result<()> {
    sr_cli::run()
}
