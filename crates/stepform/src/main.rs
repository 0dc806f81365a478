fn main() -> anyhow::Result<()> {
    stepform::cli::main()
}
