//! The persisted recommendation artifact.
//!
//! The movie table and its similarity matrix only ever travel together as a
//! [`RecommenderModel`]. On disk they are two co-located blobs plus a
//! manifest, written under temporary names and renamed into place with the
//! manifest last. Each save stamps a fresh build id into all three files;
//! load refuses blobs whose stamp differs from the manifest's.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::MovieRecord,
};

use super::{reconcile::ensure_unique_ids, similarity::SimilarityMatrix};

pub const MOVIES_FILE: &str = "movie_list.json";
pub const SIMILARITY_FILE: &str = "similarity.bin";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const FORMAT_VERSION: u32 = 2;

/// Movie table and similarity matrix bound together.
///
/// Construction enforces one matrix row per movie and unique ids, so a
/// misaligned pair cannot exist.
#[derive(Debug, Clone)]
pub struct RecommenderModel {
    movies: Vec<MovieRecord>,
    matrix: SimilarityMatrix,
    by_id: HashMap<i64, usize>,
    by_title: HashMap<String, usize>,
}

impl RecommenderModel {
    pub fn new(movies: Vec<MovieRecord>, matrix: SimilarityMatrix) -> AppResult<Self> {
        if movies.len() != matrix.dimension() {
            return Err(AppError::DataIntegrity(format!(
                "movie table has {} rows but similarity matrix is {}x{}",
                movies.len(),
                matrix.dimension(),
                matrix.dimension()
            )));
        }
        ensure_unique_ids(movies.iter().map(|m| m.id))?;

        let by_id = movies.iter().enumerate().map(|(i, m)| (m.id, i)).collect();

        // Titles are not unique; the first row carrying a title answers for it.
        let mut by_title = HashMap::with_capacity(movies.len());
        for (i, movie) in movies.iter().enumerate() {
            by_title.entry(movie.title.clone()).or_insert(i);
        }

        Ok(Self {
            movies,
            matrix,
            by_id,
            by_title,
        })
    }

    pub fn movies(&self) -> &[MovieRecord] {
        &self.movies
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Row index of the first movie with exactly this title
    pub fn index_of_title(&self, title: &str) -> Option<usize> {
        self.by_title.get(title).copied()
    }

    pub fn movie_by_id(&self, id: i64) -> Option<&MovieRecord> {
        self.by_id.get(&id).map(|&i| &self.movies[i])
    }

    pub fn movie_by_title(&self, title: &str) -> Option<&MovieRecord> {
        self.index_of_title(title).map(|i| &self.movies[i])
    }
}

/// Metadata written beside the two blobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactManifest {
    pub format_version: u32,
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub movie_count: usize,
    pub vocabulary_size: usize,
}

/// A blob tagged with the build that wrote it
#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    build_id: Uuid,
    payload: T,
}

/// Reads and writes the artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists the model as one unit and returns the manifest written
    pub fn save(&self, model: &RecommenderModel, vocabulary_size: usize) -> AppResult<ArtifactManifest> {
        std::fs::create_dir_all(&self.dir)?;

        let manifest = ArtifactManifest {
            format_version: FORMAT_VERSION,
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            movie_count: model.len(),
            vocabulary_size,
        };

        let movies = Stamped {
            build_id: manifest.build_id,
            payload: model.movies(),
        };
        let matrix = Stamped {
            build_id: manifest.build_id,
            payload: model.matrix(),
        };

        self.write_atomic(MOVIES_FILE, |w| Ok(serde_json::to_writer(w, &movies)?))?;
        self.write_atomic(SIMILARITY_FILE, |w| Ok(bincode::serialize_into(w, &matrix)?))?;
        self.write_atomic(MANIFEST_FILE, |w| Ok(serde_json::to_writer_pretty(w, &manifest)?))?;

        tracing::info!(
            dir = %self.dir.display(),
            build_id = %manifest.build_id,
            movies = manifest.movie_count,
            vocabulary = vocabulary_size,
            "Model artifacts saved"
        );

        Ok(manifest)
    }

    /// Loads the model, failing with `DataIntegrity` when the blobs belong to
    /// different builds or any count disagrees
    pub fn load(&self) -> AppResult<(RecommenderModel, ArtifactManifest)> {
        let manifest: ArtifactManifest = serde_json::from_reader(self.open(MANIFEST_FILE)?)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(AppError::DataIntegrity(format!(
                "unsupported artifact format version {}",
                manifest.format_version
            )));
        }

        let movies: Stamped<Vec<MovieRecord>> = serde_json::from_reader(self.open(MOVIES_FILE)?)?;
        check_stamp(MOVIES_FILE, movies.build_id, &manifest)?;
        let matrix: Stamped<SimilarityMatrix> =
            bincode::deserialize_from(self.open(SIMILARITY_FILE)?)?;
        check_stamp(SIMILARITY_FILE, matrix.build_id, &manifest)?;

        let (movies, matrix) = (movies.payload, matrix.payload);

        if movies.len() != manifest.movie_count {
            return Err(AppError::DataIntegrity(format!(
                "manifest lists {} movies but table has {}",
                manifest.movie_count,
                movies.len()
            )));
        }

        let model = RecommenderModel::new(movies, matrix)?;

        tracing::info!(
            dir = %self.dir.display(),
            movies = model.len(),
            build_id = %manifest.build_id,
            built_at = %manifest.built_at,
            "Model artifacts loaded"
        );

        Ok((model, manifest))
    }

    fn open(&self, name: &str) -> AppResult<BufReader<File>> {
        let path = self.dir.join(name);
        let file = File::open(&path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to open artifact");
            e
        })?;
        Ok(BufReader::new(file))
    }

    fn write_atomic<F>(&self, name: &str, write: F) -> AppResult<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> AppResult<()>,
    {
        let final_path = self.dir.join(name);
        let tmp_path = self.dir.join(format!("{}.tmp", name));

        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }
}

fn check_stamp(name: &str, build_id: Uuid, manifest: &ArtifactManifest) -> AppResult<()> {
    if build_id != manifest.build_id {
        return Err(AppError::DataIntegrity(format!(
            "{} belongs to build {} but manifest is for build {}",
            name, build_id, manifest.build_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, title: &str) -> MovieRecord {
        MovieRecord {
            id,
            title: title.to_string(),
            tags: format!("{} tags", title),
            ..Default::default()
        }
    }

    fn identity(n: usize) -> SimilarityMatrix {
        let mut scores = vec![0.0; n * n];
        for i in 0..n {
            scores[i * n + i] = 1.0;
        }
        SimilarityMatrix::from_scores(n, scores).unwrap()
    }

    #[test]
    fn test_model_rejects_dimension_mismatch() {
        let result = RecommenderModel::new(vec![movie(1, "A"), movie(2, "B")], identity(3));
        assert!(matches!(result, Err(AppError::DataIntegrity(_))));
    }

    #[test]
    fn test_model_rejects_duplicate_ids() {
        let result = RecommenderModel::new(vec![movie(1, "A"), movie(1, "B")], identity(2));
        assert!(matches!(result, Err(AppError::DataIntegrity(_))));
    }

    #[test]
    fn test_title_lookup_returns_first_row() {
        let model = RecommenderModel::new(
            vec![movie(1, "Hamlet"), movie(2, "Other"), movie(3, "Hamlet")],
            identity(3),
        )
        .unwrap();

        assert_eq!(model.index_of_title("Hamlet"), Some(0));
        assert_eq!(model.index_of_title("hamlet"), None);
        assert_eq!(model.movie_by_id(3).unwrap().title, "Hamlet");
        assert!(model.movie_by_id(42).is_none());
    }

    #[test]
    fn test_save_then_load_preserves_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.3, 0.0],
            vec![0.3, 1.0, 0.7],
            vec![0.0, 0.7, 1.0],
        ])
        .unwrap();
        let model =
            RecommenderModel::new(vec![movie(10, "A"), movie(20, "B"), movie(30, "C")], matrix)
                .unwrap();

        let written = store.save(&model, 42).unwrap();
        let (loaded, manifest) = store.load().unwrap();

        assert_eq!(manifest, written);
        assert_eq!(manifest.vocabulary_size, 42);
        assert_eq!(loaded.movies(), model.movies());
        assert_eq!(loaded.matrix(), model.matrix());
        assert!(!dir.path().join(format!("{}.tmp", MOVIES_FILE)).exists());
    }

    #[test]
    fn test_load_fails_when_table_and_matrix_disagree() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let model = RecommenderModel::new(vec![movie(1, "A"), movie(2, "B")], identity(2)).unwrap();
        let manifest = store.save(&model, 1).unwrap();

        // Replace the matrix blob with a correctly stamped one of the wrong size.
        let file = File::create(dir.path().join(SIMILARITY_FILE)).unwrap();
        let blob = Stamped {
            build_id: manifest.build_id,
            payload: identity(3),
        };
        bincode::serialize_into(BufWriter::new(file), &blob).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, AppError::DataIntegrity(_)));
    }

    #[test]
    fn test_load_fails_when_manifest_count_disagrees() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let model = RecommenderModel::new(vec![movie(1, "A")], identity(1)).unwrap();
        store.save(&model, 1).unwrap();

        let manifest = ArtifactManifest {
            format_version: FORMAT_VERSION,
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            movie_count: 5,
            vocabulary_size: 1,
        };
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        assert!(matches!(store.load(), Err(AppError::DataIntegrity(_))));
    }

    #[test]
    fn test_load_rejects_matrix_from_another_build() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let first = RecommenderModel::new(
            vec![movie(1, "A"), movie(2, "B"), movie(3, "C")],
            SimilarityMatrix::from_rows(vec![
                vec![1.0, 0.9, 0.0],
                vec![0.9, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ])
            .unwrap(),
        )
        .unwrap();
        store.save(&first, 3).unwrap();
        let stale_matrix = std::fs::read(dir.path().join(SIMILARITY_FILE)).unwrap();

        // Same row count, different order.
        let second = RecommenderModel::new(
            vec![movie(2, "B"), movie(1, "A"), movie(3, "C")],
            SimilarityMatrix::from_rows(vec![
                vec![1.0, 0.9, 0.0],
                vec![0.9, 1.0, 0.2],
                vec![0.0, 0.2, 1.0],
            ])
            .unwrap(),
        )
        .unwrap();
        let manifest = store.save(&second, 3).unwrap();
        std::fs::write(dir.path().join(SIMILARITY_FILE), stale_matrix).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, AppError::DataIntegrity(_)));
        assert!(err.to_string().contains(&manifest.build_id.to_string()));
    }

    #[test]
    fn test_each_save_gets_a_new_build_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let model = RecommenderModel::new(vec![movie(1, "A")], identity(1)).unwrap();

        let first = store.save(&model, 1).unwrap();
        let second = store.save(&model, 1).unwrap();
        assert_ne!(first.build_id, second.build_id);

        let (_, loaded) = store.load().unwrap();
        assert_eq!(loaded.build_id, second.build_id);
    }

    #[test]
    fn test_load_missing_directory_is_io_error() {
        let store = ArtifactStore::new("/definitely/not/a/model/dir");
        assert!(matches!(store.load(), Err(AppError::Io(_))));
    }
}
