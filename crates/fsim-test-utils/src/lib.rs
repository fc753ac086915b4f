//! Testing utilities for the fsim workspace
//!
//! Fixtures that materialize the sample configs into per-test directories,
//! a harness that drives them through the manager's parser and entry point,
//! and observer stubs that prove whether a task handler was reached.
//!
//! A typical error-path test:
//!
//! ```rust,ignore
//! let env = TestEnv::new();
//! let mut registry = TaskRegistry::with_defaults();
//! let stub = StubHandler::install(&mut registry, "buildafi");
//!
//! let mut bundle = env.build_bundle();
//! bundle.farm.data["ec2-build-farm"]["args"] = Value::Null;
//! bundle.write()?;
//!
//! let result = Invocation::with_bundle("buildafi", &bundle).run(env.ctx(), &registry);
//! expect_failure(result, ErrorKind::Type, Some("object is not subscriptable"));
//! stub.assert_not_called();
//! ```

pub mod bundle;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod scoped_yaml;
pub mod stub;

pub use bundle::{BuildBundle, ConfigBundle, RunBundle};
pub use error::FixtureError;
pub use fixtures::{sample_backup_configs, TestEnv, DEFAULT_WORKLOAD, GHOST_FILE};
pub use harness::{expect_failure, invoke, parse_cmdline, Invocation};
pub use scoped_yaml::{test_file_name, ScopedYamlDocument};
pub use stub::{RecordedCall, StubHandler};
