pub(super) const ROOT_LONG_ABOUT: &str = "\
Tiered video-asset manager: locate, archive, back up and stage projects

dam keeps track of video projects that live on up to four storage tiers and
moves them between tiers without ever deleting a copy before another one is
confirmed.

TIERS:

  local (flat)
    <video_projects>[/<projects_subfolder>]/<project>
    The working directory. Projects are edited here.

  archived
    <video_projects>/archived/<bucket>/<project>
    Light files (subtitles, notes, images) of projects that moved to the
    backup drive, kept locally for reference.

  backup (SSD)
    <ssd_backup>/<bucket>/<project>
    Full copies on an external drive. Older flat backups directly under
    <ssd_backup>/<project> are recognised too.

  staging (object store)
    <project>/s3-staging/ locally, <s3_prefix><project>/ remotely.
    Used to hand files to collaborators.

BUCKETS:

  Coded projects (letter, two digits, slug: b65-intro) are grouped fifty at
  a time per letter: b00-b49, b50-b99, b100-b149. Anything else goes into
  000-099.

BRANDS:

  Every command takes a brand by key (appydave), shortcut (ad) or folder
  name (v-appydave). Unknown brands are reported with the closest matches.

PROJECTS:

  Project arguments accept a full name (b65-intro), a short code (b65) or
  a glob pattern (b6*). A short code matching several projects asks which
  one to use.

COMMANDS:

  brands              List configured brands
  bucket              Print the bucket for project identifiers
  list                List projects of a brand
  manifest            Rebuild projects.json from a full scan
  archive             Copy a project to the backup drive
  sync-ssd            Copy light files from the backup drive into archived/
  s3-up / s3-down     Transfer a project's staging folder
  s3-status           Compare staging folder and object store
  s3-cleanup-remote   Delete staged objects
  s3-cleanup-local    Delete the local staging folder

CONFIGURATION:

  Brands are read from --config, else $DAM_CONFIG, else
  <config dir>/dam/brands.json. Object-store credentials come from the
  named profile in the AWS shared credentials file
  ($AWS_SHARED_CREDENTIALS_FILE or ~/.aws/credentials).

EXIT CODES:

  0    Success
  1    Completed, but some files failed to transfer
  255  Error (configuration, missing brand or project, unmounted drive, ...)

LOGGING:

  Logs go to stderr, results to stdout. The default level is warn; use -v,
  -vv or --log-level to change it. RUST_LOG applies when neither is given.
";

pub(super) const MANIFEST_LONG_ABOUT: &str = "\
Rebuild the brand's projects.json from a full scan of every tier

Every project found in the working directory, the local archive or on the
backup drive gets one entry recording where it exists, what kind of
project it is, and whether it holds heavy (video) or light files.

The file is always replaced as a whole. Nothing on any tier is modified.

Problems that need a human are printed as warnings:

  - project names that fit neither naming convention
  - backups stored under a bucket other than the one computed for them
  - archived projects whose bucket overlaps the projects still being
    worked on

The printed fingerprint changes only when the scanned state changes, so two
runs can be compared without diffing the files.

  $ dam manifest appydave
  $ dam manifest ad --dry-run -v
";

pub(super) const ARCHIVE_LONG_ABOUT: &str = "\
Copy a project to the backup drive, optionally deleting the local copy

The project is copied to <ssd_backup>/<bucket>/<project>. Dependency
caches, VCS metadata, build output and OS metadata files are not copied.

If the destination already exists the copy is skipped. With --force the
local copy is deleted, but only after the backup exists and a size
comparison against it finds nothing left to copy. If any file fails to
copy, nothing is deleted.

  $ dam archive appydave b65 --dry-run
  $ dam archive appydave b65-intro --force
";

pub(super) const SYNC_SSD_LONG_ABOUT: &str = "\
Copy light files of backed-up projects into the local archive

Reads projects.json (run `dam manifest` first) and, for every project with
a backup, copies subtitles, notes, metadata and images into
<video_projects>/archived/<bucket>/<project>. Video files stay on the
drive. Files already present with the same size are skipped.

Projects still in the working directory, and backups listed in the
manifest but missing from the drive, are skipped with a warning.
";

pub(super) const S3_TRANSFER_LONG_ABOUT: &str = "\
Transfer a project's staging folder to or from the object store

Local files are compared with stored objects by content: the MD5 of the
file against the object's ETag, recomputing multipart ETags with the
configured part size. Unchanged files are skipped, so running the command
twice transfers nothing the second time. Large files are uploaded in parts.

A failed file does not stop the others; the command exits with status 1
if any file failed.
";

pub(super) const S3_CLEANUP_LONG_ABOUT: &str = "\
Delete a project's staged copy

s3-cleanup-remote deletes every object under the project's prefix;
s3-cleanup-local deletes the local s3-staging folder. Both refuse to run
without --force. --dry-run lists what would be deleted.
";
