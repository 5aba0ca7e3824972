use anyhow::{Context as _, anyhow};

fn main() -> anyhow::Result<()> {
    let cargo_metadata::Metadata { packages, .. } = cargo_metadata::MetadataCommand::new()
        .no_deps()
        .exec()
        .context("MetadataCommand::exec")?;
    let ebpf_package = packages
        .into_iter()
        .find(|cargo_metadata::Package { name, .. }| name.as_str() == "xsteer-ebpf")
        .ok_or_else(|| anyhow!("xsteer-ebpf package not found"))?;
    aya_build::build_ebpf(
        [aya_build::Package {
            name: ebpf_package.name.as_str(),
            root_dir: ebpf_package
                .manifest_path
                .parent()
                .ok_or_else(|| anyhow!("xsteer-ebpf manifest has no parent directory"))?
                .as_str(),
            no_default_features: false,
            features: &[],
        }],
        aya_build::Toolchain::default(),
    )
}
