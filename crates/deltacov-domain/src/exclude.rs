use globset::{Glob, GlobSet, GlobSetBuilder};

#[derive(Debug, thiserror::Error)]
pub enum ClassFilterError {
    #[error("invalid exclude glob '{glob}': {source}")]
    InvalidGlob {
        glob: String,
        #[source]
        source: globset::Error,
    },
}

/// Compiled `exclude_classes` globs.
///
/// A class is excluded when a glob matches its dotted name, its slash form
/// (`com/acme/Foo`), or the diff path it resolved to.
#[derive(Debug, Clone, Default)]
pub struct ClassExclusions {
    set: Option<GlobSet>,
}

impl ClassExclusions {
    pub fn compile(globs: &[String]) -> Result<Self, ClassFilterError> {
        if globs.is_empty() {
            return Ok(Self::default());
        }

        let mut builder = GlobSetBuilder::new();
        for g in globs {
            let glob = Glob::new(g).map_err(|e| ClassFilterError::InvalidGlob {
                glob: g.clone(),
                source: e,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| ClassFilterError::InvalidGlob {
            glob: globs.join(", "),
            source: e,
        })?;
        Ok(Self { set: Some(set) })
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_none()
    }

    pub fn is_excluded(&self, class_name: &str, source_path: &str) -> bool {
        let Some(set) = &self.set else {
            return false;
        };
        set.is_match(class_name)
            || set.is_match(class_name.replace('.', "/"))
            || set.is_match(source_path)
    }
}
