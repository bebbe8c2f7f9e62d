fn main() -> anyhow::Result<()> {
    camtune_lib::run()
}
