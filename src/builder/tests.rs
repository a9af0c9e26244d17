use super::*;
use crate::{
    disk_setup::StandardDiskSetup,
    firmware::Firmware,
    volume_manager::{Volume, VolumeSize},
};
use external::{Call, Recorder};
use std::{cell::RefCell, fs, io, rc::Rc};
use tempdir::TempDir;

type Events = Rc<RefCell<Vec<String>>>;

struct FakeBootImage {
    root:   PathBuf,
    work:   PathBuf,
    events: Events,
}

impl BootImage for FakeBootImage {
    fn required(&self) -> bool { true }

    fn prepare(&mut self) -> io::Result<()> {
        self.events.borrow_mut().push("prepare".into());
        Ok(())
    }

    fn boot_root_directory(&self) -> &Path { &self.root }

    fn create_initrd(&mut self, mbrid: &ImageIdentifier) -> io::Result<PathBuf> {
        let initrd = self.work.join("initrd.xz");
        misc::write(&initrd, mbrid.to_string())?;
        Ok(initrd)
    }
}

struct FakeBootLoader {
    events: Events,
}

impl BootLoaderConfig for FakeBootLoader {
    fn setup_disk_boot_images(&mut self, boot_uuid: &str) -> io::Result<()> {
        self.events.borrow_mut().push(format!("boot images {}", boot_uuid));
        Ok(())
    }

    fn setup_disk_image_config(&mut self, boot_uuid: &str, ids: &PartitionIdMap) -> io::Result<()> {
        let keys = ids.keys().map(String::as_str).collect::<Vec<_>>().join(",");
        self.events.borrow_mut().push(format!("config {} {}", boot_uuid, keys));
        Ok(())
    }

    fn write(&mut self) -> io::Result<()> {
        self.events.borrow_mut().push("write config".into());
        Ok(())
    }
}

impl BootLoaderInstall for FakeBootLoader {
    fn install(&mut self, storage: &Path, devices: &DeviceMap) -> io::Result<()> {
        let roles = devices.keys().map(String::as_str).collect::<Vec<_>>().join(",");
        self.events.borrow_mut().push(format!("install {} {}", storage.display(), roles));
        Ok(())
    }
}

struct FakeMedia {
    events: Events,
}

impl InstallMedia for FakeMedia {
    fn create_install_iso(&mut self, raw: &Path) -> io::Result<PathBuf> {
        self.events.borrow_mut().push("iso".into());
        Ok(raw.with_extension("install.iso"))
    }

    fn create_install_pxe_archive(&mut self, raw: &Path) -> io::Result<PathBuf> {
        self.events.borrow_mut().push("pxe".into());
        Ok(raw.with_extension("install.tar"))
    }
}

impl DiskFormat for FakeMedia {
    fn create_image_format(&mut self, raw: &Path, format: &str) -> io::Result<PathBuf> {
        self.events.borrow_mut().push(format!("format {}", format));
        Ok(raw.with_extension(format))
    }
}

impl SystemSetup for FakeMedia {
    fn edit_boot_config(
        &mut self,
        filesystem: Option<FileSystemType>,
        boot_partition_id: &crate::disk::PartitionId,
    ) -> io::Result<()> {
        let filesystem = filesystem.map_or_else(String::new, |fs| fs.to_string());
        self.events.borrow_mut().push(format!("edit config {} {}", filesystem, boot_partition_id));
        Ok(())
    }

    fn edit_boot_install(&mut self, _diskname: &Path, boot_device: &Path) -> io::Result<()> {
        self.events.borrow_mut().push(format!("edit install {}", boot_device.display()));
        Ok(())
    }
}

struct Fixture {
    recorder:  Rc<Recorder>,
    events:    Events,
    source:    TempDir,
    boot_root: TempDir,
    target:    TempDir,
}

impl Fixture {
    fn new() -> Self {
        let source = TempDir::new("distimage-source").unwrap();
        fs::create_dir_all(source.path().join("boot/efi/EFI/BOOT")).unwrap();
        fs::create_dir_all(source.path().join("etc")).unwrap();
        misc::write(source.path().join("etc/os-release"), "NAME=test\n").unwrap();

        let boot_root = TempDir::new("distimage-bootroot").unwrap();
        fs::create_dir_all(boot_root.path().join("boot")).unwrap();
        misc::write(boot_root.path().join("boot/vmlinuz-5.3.18"), "kernel").unwrap();
        misc::write(boot_root.path().join("boot/xen-4.13.gz"), "xen").unwrap();

        // Stands in for the loop device, so that the disk signature has a target.
        let target = TempDir::new("distimage-target").unwrap();
        misc::write(target.path().join("loop0"), vec![0u8; 1024]).unwrap();

        let recorder = Recorder::new();
        recorder.respond("losetup", &target.path().join("loop0").display().to_string());
        recorder.respond("blkid", "5f2e-11aa");
        recorder.respond("blockdev", "1073741824");

        Fixture { recorder, events: Rc::default(), source, boot_root, target }
    }

    fn config(&self) -> DiskBuildConfig {
        DiskBuildConfig { name: "test".into(), arch: "x86_64".into(), ..DiskBuildConfig::default() }
    }

    fn builder(&self, config: DiskBuildConfig) -> DiskBuilder {
        let firmware = config.firmware_model().unwrap();
        let collaborators = Collaborators {
            boot_image:         Box::new(FakeBootImage {
                root:   self.boot_root.path().into(),
                work:   self.target.path().into(),
                events: self.events.clone(),
            }),
            disk_setup:         Box::new(StandardDiskSetup::new(&config, firmware, self.source.path())),
            bootloader_config:  Box::new(FakeBootLoader { events: self.events.clone() }),
            bootloader_install: Box::new(FakeBootLoader { events: self.events.clone() }),
            install_media:      Box::new(FakeMedia { events: self.events.clone() }),
            disk_format:        Box::new(FakeMedia { events: self.events.clone() }),
            system_setup:       Box::new(FakeMedia { events: self.events.clone() }),
        };

        DiskBuilder::new(
            config,
            self.source.path(),
            self.target.path(),
            self.recorder.clone(),
            collaborators,
        )
        .unwrap()
    }

    fn loop_device(&self) -> PathBuf { self.target.path().join("loop0") }

    fn events(&self) -> Vec<String> { self.events.borrow().clone() }

    /// The rsync call which synchronized `source`.
    fn rsync_of(&self, source: &Path) -> Call {
        let source = format!("{}/", source.display());
        self.recorder
            .calls()
            .into_iter()
            .find(|call| call.command() == "rsync" && call.argv.contains(&source))
            .unwrap()
    }

    fn position(&self, prefix: &str) -> usize { self.recorder.position(prefix).unwrap() }
}

fn excludes(call: &Call) -> Vec<String> {
    call.argv
        .windows(2)
        .filter(|pair| pair[0] == "--exclude")
        .map(|pair| pair[1].clone())
        .collect()
}

#[test]
fn efi_btrfs_disk_with_boot_partition() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        firmware: Some(Firmware::Efi),
        filesystem: Some(FileSystemType::Btrfs),
        ..fixture.config()
    };

    let result = fixture.builder(config).create().unwrap();
    let lines = fixture.recorder.lines();
    let loop0 = fixture.loop_device();

    let created = lines.iter().filter(|line| line.starts_with("sgdisk -n")).collect::<Vec<_>>();
    assert_eq!(created.len(), 3);
    assert!(created[0].contains("-c 1:p.UEFI"));
    assert!(created[1].contains("-c 2:p.lxboot"));
    assert!(created[2].contains("-c 3:p.lxroot"));
    assert_eq!(fixture.recorder.count("sfdisk --activate"), 0);

    let partids = misc::read(fixture.boot_root.path().join("config.partids")).unwrap();
    assert_eq!(
        String::from_utf8(partids).unwrap(),
        "BootPart=\"2\"\nJumpPart=\"1\"\nRootPart=\"3\"\n"
    );

    assert!(lines.contains(&"mkdosfs -F 16 -I -n EFI /dev/mapper/loop0p1".to_owned()));
    assert!(lines.contains(&"mkfs.btrfs -f -L BOOT /dev/mapper/loop0p2".to_owned()));
    assert!(lines.contains(&"mkfs.btrfs -f -L ROOT /dev/mapper/loop0p3".to_owned()));

    let source = fixture.source.path();
    assert!(excludes(&fixture.rsync_of(&source.join("boot/efi"))).is_empty());
    assert_eq!(excludes(&fixture.rsync_of(&source.join("boot"))), vec!["/efi/*"]);
    assert_eq!(excludes(&fixture.rsync_of(source)), vec![
        "/image",
        "/.profile",
        "/.kconfig",
        "/var/cache/distimage",
        "/boot/*",
        "/boot/.*",
        "/boot/efi/*",
        "/boot/efi/.*",
    ]);

    let fstab = String::from_utf8(misc::read(source.join("etc/fstab")).unwrap()).unwrap();
    assert_eq!(
        fstab,
        "UUID=5f2e-11aa / btrfs defaults 0 1\n\
         UUID=5f2e-11aa /boot btrfs defaults 0 0\n\
         UUID=5f2e-11aa /boot/efi vfat defaults 0 0\n"
    );
    assert!(fixture.position("blkid") > fixture.position("mkfs.btrfs -f -L ROOT"));
    assert!(fixture.position("blkid") < fixture.position("rsync"));

    // Boot files and the image identifier, in the tree and on the disk.
    assert!(source.join("boot/linux.vmx").is_file());
    assert!(!source.join("boot/xen.gz").exists());
    let mbrid = String::from_utf8(misc::read(source.join("boot/mbrid")).unwrap()).unwrap();
    assert_eq!(misc::read(source.join("boot/initrd.vmx")).unwrap(), mbrid.trim().as_bytes());
    let id = u32::from_str_radix(mbrid.trim().trim_start_matches("0x"), 16).unwrap();
    assert_eq!(&misc::read(&loop0).unwrap()[440..444], &id.to_le_bytes());

    assert_eq!(fixture.events(), vec![
        "prepare".to_owned(),
        "boot images 5f2e-11aa".into(),
        "config 5f2e-11aa BootPart,JumpPart,RootPart".into(),
        "write config".into(),
        "edit config btrfs 2".into(),
        format!("install {} boot,efi,root", loop0.display()),
        "edit install /dev/mapper/loop0p2".into(),
    ]);

    // Device maps and the loop device go last, in that order.
    let tail = &lines[lines.len() - 2..];
    assert_eq!(tail[0], format!("kpartx -s -d {}", loop0.display()));
    assert_eq!(tail[1], format!("losetup -d {}", loop0.display()));

    let disk = result.get("disk_image").unwrap();
    assert_eq!(disk.filename, fixture.target.path().join("test.raw"));
    assert!(disk.use_for_bundle && disk.shasum);
    assert_eq!(result.entries().len(), 1);
}

#[test]
fn install_media_skips_disk_format() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        build_type: ImageType::Oem,
        filesystem: Some(FileSystemType::Ext4),
        install_iso: true,
        install_pxe: true,
        format: Some("qcow2".into()),
        ..fixture.config()
    };

    let result = fixture.builder(config).create().unwrap();
    let raw = fixture.target.path().join("test.raw");

    assert_eq!(
        result.get("installation_image").unwrap().filename,
        raw.with_extension("install.iso")
    );
    assert_eq!(
        result.get("installation_pxe_archive").unwrap().filename,
        raw.with_extension("install.tar")
    );
    assert!(result.get("disk_format_image").is_none());
    assert!(result.get("disk_image").unwrap().use_for_bundle);

    let mut builder = fixture.builder(DiskBuildConfig {
        build_type: ImageType::Oem,
        install_pxe: true,
        format: Some("qcow2".into()),
        ..fixture.config()
    });
    match builder.create_disk_format(&mut BuildResult::default()).unwrap() {
        Conversion::Skipped(reason) => {
            assert_eq!(reason, "install media requested, skipping conversion of the disk to qcow2")
        }
        other => panic!("conversion was not skipped: {:?}", other),
    }

    let events = fixture.events();
    assert!(events.contains(&"iso".to_owned()) && events.contains(&"pxe".to_owned()));
    assert!(!events.iter().any(|event| event.starts_with("format")));

    // BIOS disks get an active root partition and no boot partition for ext4.
    let loop0 = fixture.loop_device();
    assert!(fixture.recorder.lines().contains(&format!("sfdisk --activate {} 1", loop0.display())));
    assert_eq!(excludes(&fixture.rsync_of(fixture.source.path())).len(), 4);
}

#[test]
fn disk_format_conversion() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Xfs),
        format: Some("vmdk".into()),
        bundle_compression: true,
        ..fixture.config()
    };

    let result = fixture.builder(config).create().unwrap();
    let raw = fixture.target.path().join("test.raw");

    let converted = result.get("disk_format_image").unwrap();
    assert_eq!(converted.filename, raw.with_extension("vmdk"));
    assert!(converted.use_for_bundle && converted.compress);

    let disk = result.get("disk_image").unwrap();
    assert!(!disk.use_for_bundle && disk.compress);
    assert!(fixture.events().contains(&"format vmdk".to_owned()));
}

#[test]
fn install_media_require_oem() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        install_stick: true,
        ..fixture.config()
    };

    match fixture.builder(config).create() {
        Err(Error { step: Step::Validate, why: BuildError::InstallMediaRequiresOem { build_type } }) => {
            assert_eq!(build_type, "vmx");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(fixture.recorder.calls().is_empty());
    assert!(fixture.events().is_empty());
}

#[test]
fn btrfs_volumes_need_btrfs() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        volume_manager: Some(VolumeManagerName::Btrfs),
        ..fixture.config()
    };

    match fixture.builder(config).create_disk() {
        Err(Error { step: Step::Validate, why: BuildError::VolumeManagerMismatch { .. } }) => (),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn missing_kernel_still_releases_devices() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.boot_root.path().join("boot/vmlinuz-5.3.18")).unwrap();
    let config = DiskBuildConfig { filesystem: Some(FileSystemType::Ext4), ..fixture.config() };

    match fixture.builder(config).create() {
        Err(Error { step: Step::BootFiles, why: BuildError::MissingKernel { .. } }) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    let loop0 = fixture.loop_device();
    let lines = fixture.recorder.lines();
    assert_eq!(lines[lines.len() - 1], format!("losetup -d {}", loop0.display()));
    assert_eq!(fixture.recorder.count("rsync"), 0);
}

#[test]
fn dom0_requires_hypervisor() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        domain: Some("dom0".into()),
        ..fixture.config()
    };

    fixture.builder(config).create_disk().unwrap();
    assert_eq!(misc::read(fixture.source.path().join("boot/xen.gz")).unwrap(), b"xen");
}

#[test]
fn raid_luks_and_lvm_are_stacked() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        mdraid: Some("mirroring".into()),
        luks: Some("secret".into()),
        volume_manager: Some(VolumeManagerName::Lvm),
        volumes: vec![Volume {
            name:     "LVhome".into(),
            realpath: "home".into(),
            size:     VolumeSize::Size(64),
        }],
        ..fixture.config()
    };

    let result = fixture.builder(config).create().unwrap();
    let calls = fixture.recorder.calls();
    let loop0 = fixture.loop_device();

    let mdadm = calls.iter().find(|call| call.line().starts_with("mdadm --create")).unwrap();
    let array = mdadm.argv[3].clone();
    assert!(mdadm.line().ends_with("--raid-disks 2 /dev/mapper/loop0p2 missing"));
    let luks_format = format!("luksFormat {}", array);
    assert!(fixture
        .recorder
        .lines()
        .iter()
        .any(|line| line.starts_with("cryptsetup -q --key-file") && line.ends_with(&luks_format)));
    assert!(fixture.recorder.lines().contains(&"pvcreate -ffy /dev/mapper/luksRoot".to_owned()));
    assert!(fixture.recorder.lines().contains(&"mkfs.ext4 -F -q -L ROOT /dev/systemVG/LVRoot".to_owned()));

    // Every passphrase reaches cryptsetup through a key file only.
    assert!(!calls.iter().any(|call| call.argv.iter().any(|arg| arg == "secret")));

    let partids = misc::read(fixture.boot_root.path().join("config.partids")).unwrap();
    let partids = String::from_utf8(partids).unwrap();
    assert!(partids.contains("RootPart=\"2\"\n"));
    assert!(partids.contains("RootPartVol=\"LVRoot\"\n"));
    assert!(partids.contains("BootPart=\"1\"\n"));
    assert!(fixture.boot_root.path().join("etc/mdadm.conf").is_file());
    assert_eq!(
        misc::read(fixture.source.path().join("etc/crypttab")).unwrap(),
        b"luks UUID=5f2e-11aa\n"
    );
    assert_eq!(
        misc::read(fixture.boot_root.path().join("etc/crypttab")).unwrap(),
        b"luks UUID=5f2e-11aa\n"
    );

    let fstab = misc::read(fixture.source.path().join("etc/fstab")).unwrap();
    assert_eq!(
        String::from_utf8(fstab).unwrap(),
        "/dev/systemVG/LVRoot / ext4 defaults 0 1\n\
         UUID=5f2e-11aa /boot ext4 defaults 0 0\n\
         /dev/systemVG/LVhome /home ext4 defaults 1 2\n"
    );

    // Released innermost first.
    let vg = fixture.position("vgchange -an systemVG");
    let luks = fixture.position("cryptsetup luksClose luksRoot");
    let raid = fixture.position(&format!("mdadm --stop {}", array));
    let maps = fixture.position(&format!("kpartx -s -d {}", loop0.display()));
    let detach = fixture.position(&format!("losetup -d {}", loop0.display()));
    assert!(fixture.position("rsync") < vg);
    assert!(vg < luks && luks < raid && raid < maps && maps < detach);

    assert!(!result.get("disk_image").unwrap().compress);
}

#[test]
fn unpartitioned_space_grows_table() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        firmware: Some(Firmware::Uefi),
        filesystem: Some(FileSystemType::Ext4),
        unpartitioned_mbytes: Some(100),
        ..fixture.config()
    };
    let raw = fixture.target.path().join("test.raw");
    fixture.recorder.add_path(&raw);

    fixture.builder(config).create().unwrap();

    let loop0 = fixture.loop_device();
    let resize = fixture.position(&format!("qemu-img resize -f raw {} +100M", raw.display()));
    let table = fixture.position(&format!("sgdisk --resize-table 128 {}", loop0.display()));
    assert!(fixture.position("rsync") < resize && resize < table);
    assert_eq!(fixture.recorder.count("losetup -d"), 2);
    assert_eq!(fixture.recorder.lines().last().unwrap(), &format!("losetup -d {}", loop0.display()));
}

#[test]
fn luks_root_reaches_the_initrd() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        luks: Some("secret".into()),
        luks_os: Some("sle12".into()),
        ..fixture.config()
    };

    fixture.builder(config).create_disk().unwrap();

    let crypttab = fixture.boot_root.path().join("etc/crypttab");
    assert_eq!(misc::read(&crypttab).unwrap(), b"luks UUID=5f2e-11aa\n");
    assert!(fixture
        .recorder
        .lines()
        .iter()
        .any(|line| line.contains("--cipher aes-xts-plain64") && line.contains("luksFormat")));

    let fstab = misc::read(fixture.source.path().join("etc/fstab")).unwrap();
    assert_eq!(
        String::from_utf8(fstab).unwrap(),
        "UUID=5f2e-11aa / ext4 defaults 0 1\nUUID=5f2e-11aa /boot ext4 defaults 0 0\n"
    );
}

fn assert_rejected_before_disk(fixture: &Fixture, config: DiskBuildConfig) -> BuildError {
    let why = match fixture.builder(config).create() {
        Err(Error { step: Step::Validate, why }) => why,
        other => panic!("unexpected result: {:?}", other),
    };

    assert_eq!(fixture.recorder.count("qemu-img"), 0);
    assert_eq!(fixture.recorder.count("sgdisk"), 0);
    assert!(fixture.recorder.calls().is_empty());
    why
}

#[test]
fn unsupported_raid_level_is_rejected_up_front() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        mdraid: Some("bogus".into()),
        ..fixture.config()
    };

    match assert_rejected_before_disk(&fixture, config) {
        BuildError::Storage { why: StorageError::RaidUnsupportedLevel { level } } => {
            assert_eq!(level, "bogus")
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn luks_setup_is_checked_up_front() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        luks: Some(String::new()),
        ..fixture.config()
    };

    match assert_rejected_before_disk(&fixture, config) {
        BuildError::Storage { why: StorageError::LuksEmptyPassphrase } => (),
        other => panic!("unexpected error: {}", other),
    }

    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        luks: Some("secret".into()),
        luks_os: Some("plan9".into()),
        ..fixture.config()
    };

    match assert_rejected_before_disk(&fixture, config) {
        BuildError::Storage { why: StorageError::LuksUnknownProfile { os } } => {
            assert_eq!(os, "plan9")
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn missing_source_tree_is_rejected_up_front() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig { filesystem: Some(FileSystemType::Ext4), ..fixture.config() };
    let firmware = config.firmware_model().unwrap();
    let missing = fixture.target.path().join("no-such-root");

    let collaborators = Collaborators {
        boot_image:         Box::new(FakeBootImage {
            root:   fixture.boot_root.path().into(),
            work:   fixture.target.path().into(),
            events: fixture.events.clone(),
        }),
        disk_setup:         Box::new(StandardDiskSetup::new(&config, firmware, &missing)),
        bootloader_config:  Box::new(FakeBootLoader { events: fixture.events.clone() }),
        bootloader_install: Box::new(FakeBootLoader { events: fixture.events.clone() }),
        install_media:      Box::new(FakeMedia { events: fixture.events.clone() }),
        disk_format:        Box::new(FakeMedia { events: fixture.events.clone() }),
        system_setup:       Box::new(FakeMedia { events: fixture.events.clone() }),
    };
    let mut builder =
        DiskBuilder::new(config, &missing, fixture.target.path(), fixture.recorder.clone(), collaborators)
            .unwrap();

    match builder.create() {
        Err(Error { step: Step::Validate, why: BuildError::MissingSourceTree { path } }) => {
            assert_eq!(path, missing)
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(fixture.recorder.calls().is_empty());
}

#[test]
fn efi_ext4_disk_without_boot_partition() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        firmware: Some(Firmware::Efi),
        filesystem: Some(FileSystemType::Ext4),
        ..fixture.config()
    };

    fixture.builder(config).create_disk().unwrap();

    let source = fixture.source.path();
    assert_eq!(excludes(&fixture.rsync_of(source)), vec![
        "/image",
        "/.profile",
        "/.kconfig",
        "/var/cache/distimage",
        "/boot/efi/*",
        "/boot/efi/.*",
    ]);
    assert_eq!(fixture.recorder.count("sgdisk -m"), 0);
    assert_eq!(fixture.recorder.count("sgdisk -h"), 0);
}

#[test]
fn force_mbr_wins_over_hybrid_mbr() {
    let fixture = Fixture::new();
    fixture
        .recorder
        .respond("sgdisk -i=1", "Partition GUID code: C12A7328-F81F-11D2-BA4B-00A0C93EC93B (EFI System)");
    let config = DiskBuildConfig {
        firmware: Some(Firmware::Efi),
        filesystem: Some(FileSystemType::Ext4),
        force_mbr: true,
        gpt_hybrid_mbr: true,
        ..fixture.config()
    };

    fixture.builder(config).create_disk().unwrap();

    let loop0 = fixture.loop_device();
    let mbr = fixture.position(&format!("sgdisk -m 1:2 {}", loop0.display()));
    let retype = fixture.position(&format!("sgdisk -t 1:8300 {}", loop0.display()));
    assert!(fixture.position("sgdisk -n 2:0:0") < mbr);
    assert!(mbr < retype && retype < fixture.position("kpartx -s -a"));
    assert_eq!(fixture.recorder.count("sgdisk -h"), 0);
}

#[test]
fn hybrid_mbr_needs_efi_firmware() {
    let fixture = Fixture::new();
    let config = DiskBuildConfig {
        filesystem: Some(FileSystemType::Ext4),
        force_mbr: true,
        gpt_hybrid_mbr: true,
        ..fixture.config()
    };

    fixture.builder(config).create_disk().unwrap();
    assert_eq!(fixture.recorder.count("sgdisk -m"), 0);
    assert_eq!(fixture.recorder.count("sgdisk -h"), 0);
}
