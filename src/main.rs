fn main() -> anyhow::Result<()> {
    tmssr_points_lib::run()
}
