//! PowerShell fragments spoken to the remote host.
//!
//! Hosts that already run this protocol depend on the exact control flow of
//! these scripts (directory check before delete, line-by-line base64 decode,
//! exit code 1 for a directory destination), so they are kept as versioned
//! templates rather than assembled ad hoc.

pub const PROTOCOL_VERSION: u32 = 1;

pub mod v1 {
    /// Restore exit code for "destination exists and is a directory".
    pub const DIRECTORY_CONFLICT_EXIT_CODE: i32 = 1;

    const TMP: &str = "__WINRMCP_TMP__";
    const DEST: &str = "__WINRMCP_DEST__";

    pub const RESTORE_TEMPLATE: &str = r#"
		$tmp_file_path = [System.IO.Path]::GetFullPath("__WINRMCP_TMP__")
		$dest_file_path = [System.IO.Path]::GetFullPath("__WINRMCP_DEST__".Trim("'"))
		if (Test-Path $dest_file_path) {
			if (Test-Path -Path $dest_file_path -PathType container) {
				Exit 1
			} else {
				rm $dest_file_path
			}
		}
		else {
			$dest_dir = ([System.IO.Path]::GetDirectoryName($dest_file_path))
			New-Item -ItemType directory -Force -ErrorAction SilentlyContinue -Path $dest_dir | Out-Null
		}

		if (Test-Path $tmp_file_path) {
			$reader = [System.IO.File]::OpenText($tmp_file_path)
			$writer = [System.IO.File]::OpenWrite($dest_file_path)
			try {
				for(;;) {
					$base64_line = $reader.ReadLine()
					if ($base64_line -eq $null) { break }
					$bytes = [System.Convert]::FromBase64String($base64_line)
					$writer.write($bytes, 0, $bytes.Length)
				}
			}
			finally {
				$reader.Close()
				$writer.Close()
			}
		} else {
			echo $null > $dest_file_path
		}
	"#;

    pub const CLEANUP_TEMPLATE: &str = r#"
		$tmp_file_path = [System.IO.Path]::GetFullPath("__WINRMCP_TMP__")
		if (Test-Path $tmp_file_path) {
			Remove-Item $tmp_file_path -ErrorAction SilentlyContinue
		}
	"#;

    /// Bind `variable` to a UTF-8 `StreamWriter` appending to `path`.
    pub fn open_stream(variable: &str, path: &str) -> String {
        format!(
            "${} = New-Object -TypeName System.IO.StreamWriter -ArgumentList \"{}\", $true, ([System.Text.Encoding]::UTF8)",
            variable, path
        )
    }

    /// Append one base64 line through the stream writer.
    pub fn write_line(variable: &str, content: &str) -> String {
        format!("${}.WriteLine(\"{}\")", variable, content)
    }

    pub fn close_stream(variable: &str) -> String {
        format!("${}.Close()", variable)
    }

    pub fn dispose_stream(variable: &str) -> String {
        format!("${}.Dispose()", variable)
    }

    pub fn remove_variable(variable: &str) -> String {
        format!("Remove-Variable -Name {}", variable)
    }

    /// Characters [`write_line`] adds around the encoded chunk.
    pub fn write_line_overhead(variable: &str) -> usize {
        write_line(variable, "").len()
    }

    pub fn restore(from_path: &str, to_path: &str) -> String {
        RESTORE_TEMPLATE.replace(TMP, from_path).replace(DEST, to_path)
    }

    pub fn cleanup(path: &str) -> String {
        CLEANUP_TEMPLATE.replace(TMP, path)
    }
}

#[cfg(test)]
mod tests {
    use super::v1;

    #[test]
    fn test_open_stream_command() {
        assert_eq!(
            v1::open_stream("stream_ab", "$env:TEMP\\winrmcp-1.tmp"),
            "$stream_ab = New-Object -TypeName System.IO.StreamWriter -ArgumentList \"$env:TEMP\\winrmcp-1.tmp\", $true, ([System.Text.Encoding]::UTF8)"
        );
    }

    #[test]
    fn test_teardown_commands() {
        assert_eq!(v1::write_line("s", "YQ=="), "$s.WriteLine(\"YQ==\")");
        assert_eq!(v1::close_stream("s"), "$s.Close()");
        assert_eq!(v1::dispose_stream("s"), "$s.Dispose()");
        assert_eq!(v1::remove_variable("s"), "Remove-Variable -Name s");
    }

    #[test]
    fn test_restore_substitutes_paths() {
        let script = v1::restore("$env:TEMP\\a.tmp", "C:\\out\\b.bin");
        assert!(script.contains("GetFullPath(\"$env:TEMP\\a.tmp\")"));
        assert!(script.contains("GetFullPath(\"C:\\out\\b.bin\".Trim(\"'\"))"));
        assert!(script.contains("Exit 1"));
        assert!(!script.contains("__WINRMCP_"));
    }

    #[test]
    fn test_cleanup_substitutes_path() {
        let script = v1::cleanup("$env:TEMP\\a.tmp");
        assert!(script.contains("GetFullPath(\"$env:TEMP\\a.tmp\")"));
        assert!(script.contains("-ErrorAction SilentlyContinue"));
    }

    #[test]
    fn test_write_line_overhead_fits_under_temp_path() {
        // A chunk sized against the temp path must also fit the append command.
        let variable = format!("stream_{}", "0".repeat(32));
        let temp_path = format!("$env:TEMP\\winrmcp-{}.tmp", "0".repeat(36));
        assert!(v1::write_line_overhead(&variable) <= temp_path.len());
    }
}
