//! Shared fixtures: configs, diffs and coverage reports.
//!
//! The `calculator` fixtures describe one consistent scenario. The class
//! `com.acme.Calculator` lives in `src/main/java/com/acme/Calculator.java`
//! and has three methods:
//!
//! | method   | first line | lines        | complexity (missed/covered) |
//! |----------|-----------:|--------------|-----------------------------|
//! | `<init>` | 3          | 3            | 0/1                         |
//! | `add`    | 5          | 5            | 0/1                         |
//! | `divide` | 9          | 9, 10, 12    | 1/1                         |
//!
//! Line 10 (`throw`) is the only missed line. Line 9 holds one covered and
//! one missed branch. `com.acme.Parser` lives in a file the diff never
//! touches.

use deltacov_types::{ConfigFile, CoverageEntity, Defaults, ViolationRule};

pub mod sample_configs {
    use super::*;

    pub fn empty() -> ConfigFile {
        ConfigFile::default()
    }

    /// Blanket 0.7 minimum for instruction, branch and line; fails the run.
    pub fn blanket_strict() -> ConfigFile {
        ConfigFile {
            includes: vec![],
            defaults: Defaults {
                fail_on_violation: Some(true),
                fail_if_coverage_less_than: Some(0.7),
                ..Defaults::default()
            },
            rule: vec![],
        }
    }

    /// Report-only config: violations are reported but never fatal.
    pub fn report_only() -> ConfigFile {
        ConfigFile {
            includes: vec![],
            defaults: Defaults {
                fail_on_violation: Some(false),
                ..Defaults::default()
            },
            rule: vec![
                ViolationRule {
                    entity: CoverageEntity::Instruction,
                    min_ratio: 0.7,
                },
                ViolationRule {
                    entity: CoverageEntity::Method,
                    min_ratio: 1.0,
                },
            ],
        }
    }

    pub const BLANKET_STRICT_TOML: &str = r#"[defaults]
fail_on_violation = true
fail_if_coverage_less_than = 0.7
"#;
}

pub mod sample_diffs {
    /// A single hunk adding two lines after one line of context.
    pub fn single_hunk() -> &'static str {
        "diff --git a/Foo.java b/Foo.java
--- a/Foo.java
+++ b/Foo.java
@@ -10,2 +10,3 @@
 int a = 1;
+int b = 2;
+int c = 3;
"
    }

    /// Rewrites the `divide` body of the calculator fixture (lines 10 and 12).
    pub fn calculator_divide() -> &'static str {
        "diff --git a/src/main/java/com/acme/Calculator.java b/src/main/java/com/acme/Calculator.java
index 3b18e51..a9c4d21 100644
--- a/src/main/java/com/acme/Calculator.java
+++ b/src/main/java/com/acme/Calculator.java
@@ -8,5 +8,5 @@ public class Calculator {
     public int divide(int a, int b) {
         if (b == 0) {
-            throw new IllegalArgumentException();
+            throw new ArithmeticException(\"division by zero\");
         }
-        return a/b;
+        return a / b;
"
    }

    /// Touches only the `add` method of the calculator fixture (line 5).
    pub fn calculator_add() -> &'static str {
        "diff --git a/src/main/java/com/acme/Calculator.java b/src/main/java/com/acme/Calculator.java
--- a/src/main/java/com/acme/Calculator.java
+++ b/src/main/java/com/acme/Calculator.java
@@ -5,1 +5,1 @@
-    public int add(int a, int b) { return a+b; }
+    public int add(int a, int b) { return a + b; }
"
    }

    /// Edits documentation only.
    pub fn docs_only() -> &'static str {
        "diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1,1 +1,2 @@
 # acme
+Calculator utilities.
"
    }

    pub fn binary_file() -> &'static str {
        "diff --git a/assets/logo.png b/assets/logo.png
index 1111111..2222222 100644
Binary files a/assets/logo.png and b/assets/logo.png differ
"
    }

    pub fn deleted_file() -> &'static str {
        "diff --git a/src/Old.java b/src/Old.java
deleted file mode 100644
index 1111111..0000000
--- a/src/Old.java
+++ /dev/null
@@ -1,2 +0,0 @@
-class Old {
-}
"
    }

    pub fn renamed_file() -> &'static str {
        "diff --git a/src/Old.java b/src/New.java
similarity index 90%
rename from src/Old.java
rename to src/New.java
index 1111111..2222222 100644
--- a/src/Old.java
+++ b/src/New.java
@@ -1,1 +1,2 @@
 class New {
+  int x;
"
    }

    pub fn malformed_hunk() -> &'static str {
        "diff --git a/Foo.java b/Foo.java
--- a/Foo.java
+++ b/Foo.java
@@ -1,1 +one,1 @@
+int a;
"
    }

    pub fn empty() -> &'static str {
        ""
    }
}

pub mod sample_reports {
    pub const CSV_HEADER: &str = "GROUP,PACKAGE,CLASS,INSTRUCTION_MISSED,INSTRUCTION_COVERED,BRANCH_MISSED,BRANCH_COVERED,LINE_MISSED,LINE_COVERED,COMPLEXITY_MISSED,COMPLEXITY_COVERED,METHOD_MISSED,METHOD_COVERED";

    /// One row whose counters are 1..=10 in column order.
    pub fn csv_single_row() -> String {
        format!("{CSV_HEADER}\ngroup,package,class,1,2,3,4,5,6,7,8,9,10")
    }

    pub fn csv_header_only() -> String {
        CSV_HEADER.to_string()
    }

    /// Aggregate counters for the calculator scenario.
    pub fn calculator_csv() -> String {
        format!(
            "{CSV_HEADER}
demo,com.acme,Calculator,5,11,1,1,1,4,1,3,0,3
demo,com.acme,Parser,10,30,2,6,3,9,2,6,0,4
"
        )
    }

    /// Line-level JaCoCo XML for the calculator scenario.
    pub fn calculator_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="demo">
  <sessioninfo id="host-1" start="1700000000000" dump="1700000001000"/>
  <package name="com/acme">
    <class name="com/acme/Calculator" sourcefilename="Calculator.java">
      <method name="&lt;init&gt;" desc="()V" line="3">
        <counter type="INSTRUCTION" missed="0" covered="3"/>
        <counter type="LINE" missed="0" covered="1"/>
        <counter type="COMPLEXITY" missed="0" covered="1"/>
        <counter type="METHOD" missed="0" covered="1"/>
      </method>
      <method name="add" desc="(II)I" line="5">
        <counter type="INSTRUCTION" missed="0" covered="4"/>
        <counter type="LINE" missed="0" covered="1"/>
        <counter type="COMPLEXITY" missed="0" covered="1"/>
        <counter type="METHOD" missed="0" covered="1"/>
      </method>
      <method name="divide" desc="(II)I" line="9">
        <counter type="INSTRUCTION" missed="5" covered="4"/>
        <counter type="BRANCH" missed="1" covered="1"/>
        <counter type="LINE" missed="1" covered="2"/>
        <counter type="COMPLEXITY" missed="1" covered="1"/>
        <counter type="METHOD" missed="0" covered="1"/>
      </method>
      <counter type="INSTRUCTION" missed="5" covered="11"/>
      <counter type="BRANCH" missed="1" covered="1"/>
      <counter type="LINE" missed="1" covered="4"/>
      <counter type="COMPLEXITY" missed="1" covered="3"/>
      <counter type="METHOD" missed="0" covered="3"/>
      <counter type="CLASS" missed="0" covered="1"/>
    </class>
    <class name="com/acme/Parser" sourcefilename="Parser.java">
      <method name="parse" desc="(Ljava/lang/String;)I" line="4">
        <counter type="INSTRUCTION" missed="2" covered="6"/>
        <counter type="LINE" missed="1" covered="2"/>
        <counter type="COMPLEXITY" missed="0" covered="1"/>
        <counter type="METHOD" missed="0" covered="1"/>
      </method>
      <counter type="INSTRUCTION" missed="2" covered="6"/>
      <counter type="LINE" missed="1" covered="2"/>
      <counter type="COMPLEXITY" missed="0" covered="1"/>
      <counter type="METHOD" missed="0" covered="1"/>
      <counter type="CLASS" missed="0" covered="1"/>
    </class>
    <sourcefile name="Calculator.java">
      <line nr="3" mi="0" ci="3" mb="0" cb="0"/>
      <line nr="5" mi="0" ci="4" mb="0" cb="0"/>
      <line nr="9" mi="0" ci="2" mb="1" cb="1"/>
      <line nr="10" mi="5" ci="0" mb="0" cb="0"/>
      <line nr="12" mi="0" ci="2" mb="0" cb="0"/>
      <counter type="INSTRUCTION" missed="5" covered="11"/>
      <counter type="LINE" missed="1" covered="4"/>
    </sourcefile>
    <sourcefile name="Parser.java">
      <line nr="4" mi="0" ci="3" mb="0" cb="0"/>
      <line nr="5" mi="2" ci="0" mb="0" cb="0"/>
      <line nr="6" mi="0" ci="3" mb="0" cb="0"/>
    </sourcefile>
    <counter type="INSTRUCTION" missed="7" covered="17"/>
  </package>
  <counter type="INSTRUCTION" missed="7" covered="17"/>
</report>
"#
    }
}
